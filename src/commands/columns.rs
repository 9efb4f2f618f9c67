//! Columns command implementation.
//!
//! Lists the output column catalogue.

use lsfd::Column;

/// Formats the catalogue, one column per line.
pub fn column_listing(types: bool) -> Vec<String> {
    let width = Column::ALL
        .iter()
        .map(|c| c.name().len())
        .max()
        .unwrap_or(0);

    Column::ALL
        .iter()
        .map(|col| {
            let info = col.info();
            if types {
                format!(
                    "{:>width$}  {:<9} {}",
                    info.name,
                    info.json_type.to_string(),
                    info.help,
                    width = width
                )
            } else {
                format!("{:>width$}  {}", info.name, info.help, width = width)
            }
        })
        .collect()
}

/// Prints the available output columns.
pub fn command_columns(types: bool) -> anyhow::Result<()> {
    println!("Available output columns:");
    for line in column_listing(types) {
        println!(" {}", line);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_covers_catalogue() {
        let lines = column_listing(false);
        assert_eq!(lines.len(), Column::ALL.len());
        assert!(lines[0].trim_start().starts_with("ASSOC"));
        assert!(lines.iter().any(|l| l.contains("MAJ:MIN")));
    }

    #[test]
    fn test_listing_with_types() {
        let lines = column_listing(true);
        let fd = lines
            .iter()
            .find(|l| l.trim_start().starts_with("FD "))
            .expect("FD listed");
        assert!(fd.contains("<number>"));
        assert!(fd.contains("file descriptor for the file"));
    }
}
