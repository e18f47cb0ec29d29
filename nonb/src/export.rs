//! Thin export adapters over the motif-record schema.

use std::fs::File;
use std::io::{stdout, Write};
use std::path::Path;

use eyre::Result;
use libnonb::{AttrValue, Motif};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Format {
    Csv,
    Tsv,
    Bed,
    Json,
}

/// Attribute columns exported alongside the core schema; absent slots
/// render as "N/A".
const ATTR_COLUMNS: &[&str] = &[
    "Arm_Length",
    "Loop_Length",
    "Repeat_Unit",
    "Copy_Number",
    "Purity",
    "DeltaG",
    "GC_Content",
    "Type_Of_Repeat",
    "Criterion",
    "Disease_Relevance",
    "Regions_Involved",
];

/// Write to the named file, or stdout when no filename is given.
pub fn stdout_or_file<P>(filename: Option<P>) -> Result<Box<dyn Write>>
where
    P: AsRef<Path>,
{
    if let Some(fp) = filename {
        let handle = File::create(fp)?;
        Ok(Box::new(handle))
    } else {
        let handle = stdout().lock();
        Ok(Box::new(handle))
    }
}

pub fn write_motifs(motifs: &[Motif], format: Format, writer: Box<dyn Write>) -> Result<()> {
    match format {
        Format::Csv => write_delimited(motifs, b',', writer),
        Format::Tsv => write_delimited(motifs, b'\t', writer),
        Format::Bed => write_bed(motifs, writer),
        Format::Json => write_json(motifs, writer),
    }
}

fn attr_text(motif: &Motif, key: &str) -> String {
    match motif.attr(key) {
        Some(AttrValue::Na) | None => "N/A".to_string(),
        Some(value) => value.to_string(),
    }
}

fn write_delimited(motifs: &[Motif], delimiter: u8, writer: Box<dyn Write>) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(writer);
    let mut header = vec![
        "ID",
        "Sequence_Name",
        "Class",
        "Subclass",
        "Start",
        "End",
        "Length",
        "Sequence",
        "Raw_Score",
        "Score",
        "Strand",
        "Method",
        "Pattern_ID",
    ];
    header.extend(ATTR_COLUMNS);
    wtr.write_record(&header)?;
    for m in motifs {
        let mut record = vec![
            m.id.clone(),
            m.sequence_name.clone(),
            m.class.canonical_name().to_string(),
            m.subclass.clone(),
            m.start.to_string(),
            m.end.to_string(),
            m.length.to_string(),
            m.sequence.clone(),
            format!("{}", m.raw_score),
            format!("{}", m.score),
            m.strand.as_str().to_string(),
            m.method.clone(),
            m.pattern_id.clone(),
        ];
        for key in ATTR_COLUMNS {
            record.push(attr_text(m, key));
        }
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// BED6: 0-based half-open coordinates, score rescaled to 0-1000.
fn write_bed(motifs: &[Motif], mut writer: Box<dyn Write>) -> Result<()> {
    for m in motifs {
        let bed_score = ((m.score / 3.0) * 1000.0).round() as u32;
        writeln!(
            writer,
            "{}\t{}\t{}\t{}\t{}\t{}",
            m.sequence_name,
            m.start - 1,
            m.end,
            m.id,
            bed_score.min(1000),
            m.strand.as_str()
        )?;
    }
    Ok(())
}

fn write_json(motifs: &[Motif], writer: Box<dyn Write>) -> Result<()> {
    serde_json::to_writer_pretty(writer, motifs)?;
    Ok(())
}
