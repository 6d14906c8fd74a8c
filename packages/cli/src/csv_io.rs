//! CSV input parsing and result export.
//!
//! Input files carry a header row: `id,endereco` for address batches or
//! `id,latitude,longitude` for coordinate batches. Unparsable numbers are
//! read as absent so the resolver reports them per row instead of aborting
//! the whole file.

use std::io::{Read, Write};

use sector_map_resolver_models::{
    CoordinateInput, QueryKind, ResolutionRequest, ResolutionResult,
};
use serde::Deserialize;

/// Output header, matching the web UI's CSV export.
pub const OUTPUT_HEADER: [&str; 6] = [
    "id",
    "Endereço ou Coordenadas",
    "Código Setor Censitário",
    "Município",
    "Bairro",
    "Erro",
];

#[derive(Debug, Deserialize)]
struct AddressRow {
    id: Option<String>,
    endereco: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CoordinateRow {
    id: Option<String>,
    #[serde(deserialize_with = "csv::invalid_option")]
    latitude: Option<f64>,
    #[serde(deserialize_with = "csv::invalid_option")]
    longitude: Option<f64>,
}

/// Reads one request per CSV row.
///
/// # Errors
///
/// Returns [`csv::Error`] if the input is not valid CSV or lacks the
/// expected header row.
pub fn read_requests<R: Read>(
    input: R,
    kind: QueryKind,
) -> Result<Vec<ResolutionRequest>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(input);

    match kind {
        QueryKind::Address => reader
            .deserialize::<AddressRow>()
            .map(|row| {
                row.map(|row| ResolutionRequest {
                    correlation_id: row.id,
                    kind: QueryKind::Address,
                    address_text: row.endereco,
                    coordinate: None,
                })
            })
            .collect(),
        QueryKind::Coordinates => reader
            .deserialize::<CoordinateRow>()
            .map(|row| {
                row.map(|row| ResolutionRequest {
                    correlation_id: row.id,
                    kind: QueryKind::Coordinates,
                    address_text: None,
                    coordinate: Some(CoordinateInput {
                        latitude: row.latitude,
                        longitude: row.longitude,
                    }),
                })
            })
            .collect(),
    }
}

/// Writes the header and one row per result.
///
/// # Errors
///
/// Returns [`csv::Error`] if writing to `output` fails.
pub fn write_results<W: Write>(output: W, results: &[ResolutionResult]) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(output);
    writer.write_record(OUTPUT_HEADER)?;

    for result in results {
        let erro = result
            .failure
            .as_ref()
            .map_or("", |failure| failure.message.as_str());

        writer.write_record([
            result.correlation_id.as_deref().unwrap_or(""),
            result.queried_as.as_str(),
            result.sector_code.as_str(),
            result.area_name.as_str(),
            result.sub_area_name.as_deref().unwrap_or(""),
            erro,
        ])?;
    }

    writer.flush()?;
    Ok(())
}
