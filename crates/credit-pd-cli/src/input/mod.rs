pub mod file;
pub mod stdin;

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Resolve `--input <file>` or piped stdin into a JSON value.
pub fn read_value(path: Option<&str>) -> Result<Value, Box<dyn std::error::Error>> {
    if let Some(path) = path {
        file::read_structured(path)
    } else if let Some(data) = stdin::read_stdin()? {
        Ok(data)
    } else {
        Err("--input <file.json|file.yaml> or stdin required".into())
    }
}

pub fn read_typed<T: DeserializeOwned>(path: Option<&str>) -> Result<T, Box<dyn std::error::Error>> {
    Ok(serde_json::from_value(read_value(path)?)?)
}
