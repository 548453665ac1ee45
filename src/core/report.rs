// NeuroSuite - core/report.rs
//
// Plain-text and JSON rendering of analysis results for the CLI.
// Core layer: writes to any Write trait object.

use crate::core::model::{
    stage_description, ClassificationResult, EegFileInfo, SleepStageInfo,
};
use std::io::{self, Write};

/// Render a result as human-readable text.
///
/// `stages` is the sleep-stage reference list; when it contains the
/// predicted stage its description is printed alongside.
pub fn write_text<W: Write>(
    result: &ClassificationResult,
    stages: &[SleepStageInfo],
    mut out: W,
) -> io::Result<()> {
    match result {
        ClassificationResult::Eeg(eeg) => {
            writeln!(out, "Decoded brain activity")?;
            writeln!(out, "  Image:    {}", eeg.image_url)?;
            writeln!(out, "  Insights: {}", eeg.insights)?;
        }
        ClassificationResult::Sleep(sleep) => {
            writeln!(out, "Sleep stage: {} (stage {})", sleep.stage_name, sleep.stage)?;
            if let Some(desc) = stage_description(stages, &sleep.stage_name) {
                writeln!(out, "  {desc}")?;
            }
            let percentages = sleep.probability_percentages();
            if !percentages.is_empty() {
                writeln!(out, "  Probabilities:")?;
                for (idx, pct) in percentages.iter().enumerate() {
                    let name = stages
                        .iter()
                        .find(|s| s.id as usize == idx)
                        .map(|s| s.name.as_str())
                        .unwrap_or("");
                    if name.is_empty() {
                        writeln!(out, "    stage {idx:<2} {pct:>5}%")?;
                    } else {
                        writeln!(out, "    {name:<8} {pct:>5}%")?;
                    }
                }
            }
        }
        ClassificationResult::Emotion(emotion) => {
            writeln!(
                out,
                "Emotion: {} ({:.1}% confidence)",
                emotion.emotion,
                emotion.confidence * 100.0
            )?;
            if !emotion.description.is_empty() {
                writeln!(out, "  {}", emotion.description)?;
            }
            if let Some(meta) = &emotion.metadata {
                writeln!(out, "  Channels: {}", meta.channels.join(", "))?;
                if let Some(rate) = meta.sampling_rate {
                    writeln!(out, "  Sampling rate: {rate} Hz")?;
                }
                if let Some(duration) = meta.duration {
                    writeln!(out, "  Duration: {duration:.1} s")?;
                }
            }
        }
    }
    Ok(())
}

/// Render EEG file metadata as text.
pub fn write_file_info<W: Write>(info: &EegFileInfo, mut out: W) -> io::Result<()> {
    writeln!(out, "File information")?;
    writeln!(out, "  Channels:  {}", info.channels.join(", "))?;
    writeln!(out, "  Sampling:  {} Hz", info.sampling_frequency)?;
    writeln!(out, "  Duration:  {:.1} s", info.duration_seconds)?;
    writeln!(out, "  Samples:   {}", info.num_samples)?;
    Ok(())
}

/// Render any serialisable value as pretty JSON followed by a newline.
pub fn write_json<W: Write, T: serde::Serialize + ?Sized>(value: &T, mut out: W) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out)
}
