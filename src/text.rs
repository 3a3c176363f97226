use std::fs;
use std::io;
use std::io::prelude::*;
use std::path;

/// Read one value per line from `path`, taking the first whitespace separated
/// column and skipping blank lines
pub fn load_values<P: AsRef<path::Path>>(path: P) -> io::Result<Vec<f64>> {
    let reader = io::BufReader::new(fs::File::open(path)?);
    let mut values = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let Some(token) = line.split_whitespace().next() else {
            continue;
        };
        let value = token.parse::<f64>().map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Failed to parse {token:?} on line {}: {e}", i + 1),
            )
        })?;
        values.push(value);
    }
    Ok(values)
}

pub fn to_file<P: AsRef<path::Path>>(values: &[f64], path: P) -> io::Result<()> {
    let file = fs::File::create(path)?;
    let mut writer = io::BufWriter::new(file);
    for value in values {
        writer.write_all(format!("{}\n", value).as_bytes())?;
    }
    writer.flush()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_round_trip_through_file() -> io::Result<()> {
        let path = std::env::temp_dir().join("mzmixture_text_round_trip.txt");
        let values = [1.5, -2.25, 1e-7, 42.0];
        to_file(&values, &path)?;
        let loaded = load_values(&path)?;
        fs::remove_file(&path)?;
        assert_eq!(loaded, values);
        Ok(())
    }

    #[test]
    fn test_load_skips_blank_lines_and_extra_columns() -> io::Result<()> {
        let path = std::env::temp_dir().join("mzmixture_text_columns.txt");
        fs::write(&path, "1.0\t5\n\n  2.5 extra\n")?;
        let loaded = load_values(&path)?;
        fs::remove_file(&path)?;
        assert_eq!(loaded, vec![1.0, 2.5]);
        Ok(())
    }

    #[test]
    fn test_load_rejects_garbage() {
        let path = std::env::temp_dir().join("mzmixture_text_garbage.txt");
        fs::write(&path, "1.0\nnot-a-number\n").unwrap();
        let err = load_values(&path).unwrap_err();
        fs::remove_file(&path).unwrap();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_fixture_loads() {
        let values = load_values("./test/data/trimodal.txt").unwrap();
        assert_eq!(values.len(), 370);
        assert!(values.iter().all(|v| v.is_finite()));
    }
}
