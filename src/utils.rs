use crate::types::month::Month;
use crate::types::variable::Variable;
use chrono::NaiveDate;
use log::info;
use std::io;
use std::path::Path;

pub const DEFAULT_OUTPUT_DIR_NAME: &str = "data_gov_sg_met_v1";

/// `<variable>_<yyyy>_<mm>_c<fetch date>.csv.gz`; the fetch date keeps
/// repeated downloads of the same month from overwriting each other.
pub fn output_file_name(variable: Variable, month: Month, fetch_date: NaiveDate) -> String {
    format!(
        "{}_{:04}_{:02}_c{}.csv.gz",
        variable,
        month.year(),
        month.month(),
        fetch_date.format("%Y%m%d")
    )
}

pub fn ensure_output_dir_exists(path: &Path) -> io::Result<()> {
    match std::fs::metadata(path) {
        Ok(metadata) => {
            if !metadata.is_dir() {
                return Err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("Output path exists but is not a directory: {}", path.display()),
                ));
            }
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            std::fs::create_dir_all(path)?;
            info!("Created {}", path.display());
            Ok(())
        }
        Err(e) => Err(e),
    }
}
