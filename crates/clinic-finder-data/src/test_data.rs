use std::io::Write;

use tempfile::NamedTempFile;
use tracing::info;

use super::error::Result;

/// Configuration for fixture CSV generation
#[derive(Debug, Clone)]
pub struct TestDataConfig {
    /// Number of rows with usable coordinates
    pub valid_rows: usize,
    /// Number of rows whose coordinates fail to parse (interleaved with the valid ones)
    pub invalid_rows: usize,
    /// Whether to sprinkle blank lines between rows
    pub blank_lines: bool,
    /// Whether to add CITY and PHONE columns
    pub extra_columns: bool,
}

impl Default for TestDataConfig {
    fn default() -> Self {
        Self::sample()
    }
}

impl TestDataConfig {
    /// Minimal data for unit tests
    pub fn minimal() -> Self {
        Self {
            valid_rows: 3,
            invalid_rows: 0,
            blank_lines: false,
            extra_columns: false,
        }
    }

    /// Sample data for integration tests
    pub fn sample() -> Self {
        Self {
            valid_rows: SAMPLE_CLINICS.len(),
            invalid_rows: 2,
            blank_lines: true,
            extra_columns: true,
        }
    }
}

/// (name, city, lat, long)
pub const SAMPLE_CLINICS: [(&str, &str, f64, f64); 12] = [
    ("Poliambulatorio Duomo", "Milano", 45.4642, 9.1900),
    ("Clinica Navigli", "Milano", 45.4520, 9.1760),
    ("Centro Medico Colosseo", "Roma", 41.8902, 12.4922),
    ("Clinica Trastevere", "Roma", 41.8867, 12.4692),
    ("Ambulatorio Santa Croce", "Firenze", 43.7687, 11.2569),
    ("Studio Medico Mole", "Torino", 45.0690, 7.6933),
    ("Clinica Vomero", "Napoli", 40.8458, 14.2328),
    ("Centro Salute Lanterna", "Genova", 44.4056, 8.9463),
    ("Poliambulatorio Rialto", "Venezia", 45.4380, 12.3358),
    ("Clinica Due Torri", "Bologna", 44.4939, 11.3465),
    ("Ambulatorio Politeama", "Palermo", 38.1238, 13.3540),
    ("Centro Medico Petruzzelli", "Bari", 41.1233, 16.8714),
];

/// Render fixture CSV text for `config`.
///
/// Rows beyond the sample list repeat it with a numeric suffix on the name.
pub fn sample_clinics_csv(config: &TestDataConfig) -> String {
    let mut csv = String::new();
    if config.extra_columns {
        csv.push_str("NAME,LAT,LONG,CITY,PHONE\n");
    } else {
        csv.push_str("NAME,LAT,LONG\n");
    }

    let mut invalid_left = config.invalid_rows;
    for i in 0..config.valid_rows {
        let (name, city, lat, long) = SAMPLE_CLINICS[i % SAMPLE_CLINICS.len()];
        let round = i / SAMPLE_CLINICS.len();
        let name = if round == 0 {
            name.to_string()
        } else {
            format!("{name} {}", round + 1)
        };
        write_row(&mut csv, config, &name, &lat.to_string(), &long.to_string(), city);

        if invalid_left > 0 && i % 3 == 1 {
            write_invalid_row(&mut csv, config, config.invalid_rows - invalid_left);
            invalid_left -= 1;
        }
        if config.blank_lines && i % 4 == 3 {
            csv.push('\n');
        }
    }
    while invalid_left > 0 {
        write_invalid_row(&mut csv, config, config.invalid_rows - invalid_left);
        invalid_left -= 1;
    }
    csv
}

fn write_row(csv: &mut String, config: &TestDataConfig, name: &str, lat: &str, long: &str, city: &str) {
    if config.extra_columns {
        csv.push_str(&format!("{name},{lat},{long},{city},+39 02 0000000\n"));
    } else {
        csv.push_str(&format!("{name},{lat},{long}\n"));
    }
}

fn write_invalid_row(csv: &mut String, config: &TestDataConfig, n: usize) {
    if n % 2 == 0 {
        write_row(csv, config, &format!("Broken Lat {n}"), "n/a", "9.0", "Nowhere");
    } else {
        write_row(csv, config, &format!("Broken Long {n}"), "45.0", "", "Nowhere");
    }
}

/// Write fixture CSV to a temporary file.
pub fn create_test_data(config: &TestDataConfig) -> Result<NamedTempFile> {
    info!("Creating clinic test data with config: {:?}", config);

    let mut file = NamedTempFile::with_suffix(".csv")?;
    file.write_all(sample_clinics_csv(config).as_bytes())?;
    file.flush()?;
    Ok(file)
}
