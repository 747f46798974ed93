use adler_scoring::scoring::{BatchScores, ElementId, ScoreResult, UserId};
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::Serialize;
use std::io::{self, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub(crate) enum OutputFormat {
    #[default]
    Json,
    Csv,
}

/// One line of a score report. Failed elements carry the error instead of a score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct ScoreRow {
    pub(crate) element_id: ElementId,
    pub(crate) score: Option<f64>,
    pub(crate) error: Option<&'static str>,
    pub(crate) message: Option<String>,
}

impl ScoreRow {
    pub(crate) fn new(element_id: ElementId, result: &ScoreResult) -> Self {
        match result {
            Ok(score) => Self {
                element_id,
                score: Some(*score),
                error: None,
                message: None,
            },
            Err(err) => Self {
                element_id,
                score: None,
                error: Some(err.code()),
                message: Some(err.to_string()),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ScoreReport {
    pub(crate) generated_at: DateTime<Utc>,
    pub(crate) user_id: UserId,
    pub(crate) total: f64,
    pub(crate) scores: Vec<ScoreRow>,
}

impl ScoreReport {
    pub(crate) fn from_batch(
        user_id: UserId,
        scores: &BatchScores,
        generated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            generated_at,
            user_id,
            total: scores.total(),
            scores: scores
                .iter()
                .map(|(element_id, result)| ScoreRow::new(*element_id, result))
                .collect(),
        }
    }

    pub(crate) fn single(
        user_id: UserId,
        element_id: ElementId,
        score: f64,
        generated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            generated_at,
            user_id,
            total: score,
            scores: vec![ScoreRow::new(element_id, &Ok(score))],
        }
    }

    pub(crate) fn write<W: Write>(&self, format: OutputFormat, out: W) -> io::Result<()> {
        match format {
            OutputFormat::Json => self.write_json(out),
            OutputFormat::Csv => self.write_csv(out),
        }
    }

    fn write_json<W: Write>(&self, mut out: W) -> io::Result<()> {
        serde_json::to_writer_pretty(&mut out, self)?;
        writeln!(out)
    }

    fn write_csv<W: Write>(&self, out: W) -> io::Result<()> {
        let mut writer = csv::Writer::from_writer(out);
        for row in &self.scores {
            writer.serialize(row).map_err(io::Error::from)?;
        }
        writer.flush()
    }
}
