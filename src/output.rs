use std::io::{self, Write};

use serde::Serialize;

use crate::extract::ExtractReport;
use crate::membership::PushSummary;
use crate::resolver::ResolveReport;

#[derive(Debug, Clone, Serialize)]
pub struct CleanResult {
    pub directory: String,
    pub removed: usize,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_resolve(result: &ResolveReport) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_extract(result: &ExtractReport) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_push(result: &PushSummary) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_clean(result: &CleanResult) -> io::Result<()> {
        Self::print_json(result)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}
