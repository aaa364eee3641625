//! Streaming feed assembly: source PLA rows in, tab-delimited feed rows out.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use feedgen_core::{EnrichedOfferData, FeedRow, RawOfferRecord};

use crate::attributes::{map_attributes, MappingContext};
use crate::error::FeedError;
use crate::multiplier::{MultiplierIndex, MultiplierSource};
use crate::sources::append_lines;

/// Everything needed to assemble one merchant's feed.
#[derive(Debug, Clone, Copy)]
pub struct FeedContext<'a> {
    pub mapping: MappingContext<'a>,
    /// The merchant's placements, in output order.
    pub placements: &'a [String],
    pub multipliers: &'a MultiplierIndex,
    pub enrichment: &'a HashMap<String, EnrichedOfferData>,
}

/// How many rows each multiplier rung produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdjustmentCounts {
    pub exact: usize,
    pub placement: usize,
    pub merchant_average: usize,
    pub fallback: usize,
}

impl AdjustmentCounts {
    fn record(&mut self, source: MultiplierSource) {
        match source {
            MultiplierSource::Exact => self.exact += 1,
            MultiplierSource::Placement => self.placement += 1,
            MultiplierSource::MerchantAverage => self.merchant_average += 1,
            MultiplierSource::Fallback => self.fallback += 1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssembleReport {
    pub offers_read: usize,
    pub rows_written: usize,
    /// Source IDs with no enrichment record, in source order.
    pub rejected_ids: Vec<String>,
    pub adjustments: AdjustmentCounts,
}

/// Reads tab-delimited PLA rows from `source` and writes the feed (header
/// first) to `sink`.
///
/// Offers without enrichment are skipped and reported. A merchant without
/// placements gets one row per offer at the unadjusted CPC; otherwise each
/// offer expands to one row per placement with the placement index appended
/// to its ID.
///
/// # Errors
///
/// Returns [`FeedError::SourceRead`] if the source cannot be parsed or
/// [`FeedError::Write`] if the sink fails.
pub fn assemble_feed<R: Read, W: Write>(
    ctx: &FeedContext<'_>,
    source: R,
    sink: W,
) -> Result<AssembleReport, FeedError> {
    assemble_from(ctx, source, sink, "source feed")
}

fn assemble_from<R: Read, W: Write>(
    ctx: &FeedContext<'_>,
    source: R,
    mut sink: W,
    source_label: &str,
) -> Result<AssembleReport, FeedError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .from_reader(source);

    sink.write_all(FeedRow::header_line().as_bytes())
        .map_err(FeedError::Write)?;

    let mut report = AssembleReport::default();
    for record in reader.deserialize::<RawOfferRecord>() {
        let offer = record.map_err(|source| FeedError::SourceRead {
            context: source_label.to_string(),
            source,
        })?;
        report.offers_read += 1;

        let Some(base) = ctx.enrichment.get(&offer.id) else {
            report.rejected_ids.push(offer.id);
            continue;
        };

        if ctx.placements.is_empty() {
            let row = map_attributes(&ctx.mapping, &offer, &offer.id, base, "");
            write_row(&mut sink, &row)?;
            report.rows_written += 1;
            continue;
        }

        for (index, placement_id) in ctx.placements.iter().enumerate() {
            let (adjusted_cpc, rung) = ctx.multipliers.adjust_cpc(
                base.estimated_cpc,
                placement_id,
                base.ecpc_multiplier_key.as_deref(),
            );
            let adjusted = base.with_estimated_cpc(adjusted_cpc);
            let offer_id = format!("{}{index}", offer.id);
            let row = map_attributes(&ctx.mapping, &offer, &offer_id, &adjusted, placement_id);
            write_row(&mut sink, &row)?;
            report.rows_written += 1;
            report.adjustments.record(rung);
        }
    }

    sink.flush().map_err(FeedError::Write)?;
    Ok(report)
}

fn write_row<W: Write>(sink: &mut W, row: &FeedRow) -> Result<(), FeedError> {
    sink.write_all(row.to_line().as_bytes())
        .map_err(FeedError::Write)
}

fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination.as_os_str().to_owned();
    name.push(".partial");
    PathBuf::from(name)
}

/// Assembles `source_path` into `destination`.
///
/// Output is written to a `.partial` sibling and renamed into place only
/// when assembly succeeds, so a failed run never leaves a truncated feed.
/// Rejected IDs are then appended to `rejects_path`; failure to record them
/// is logged and does not fail the call.
///
/// # Errors
///
/// Returns [`FeedError::Io`] for filesystem failures and propagates
/// [`assemble_feed`] errors.
pub fn create_feed_file(
    ctx: &FeedContext<'_>,
    source_path: &Path,
    destination: &Path,
    rejects_path: &Path,
) -> Result<AssembleReport, FeedError> {
    let source = File::open(source_path).map_err(|e| FeedError::io(source_path, e))?;
    let partial = partial_path(destination);
    let out = File::create(&partial).map_err(|e| FeedError::io(&partial, e))?;

    let result = assemble_from(
        ctx,
        source,
        BufWriter::new(out),
        &source_path.display().to_string(),
    )
    .and_then(|report| {
        fs::rename(&partial, destination).map_err(|e| FeedError::io(destination, e))?;
        Ok(report)
    });

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            if let Err(cleanup) = fs::remove_file(&partial) {
                tracing::debug!(path = %partial.display(), error = %cleanup, "partial feed not removed");
            }
            return Err(e);
        }
    };

    if let Err(e) = append_lines(rejects_path, &report.rejected_ids) {
        tracing::warn!(
            path = %rejects_path.display(),
            rejected = report.rejected_ids.len(),
            error = %e,
            "failed to record rejected product IDs"
        );
    }

    tracing::info!(
        merchant_id = %ctx.mapping.merchant.id,
        destination = %destination.display(),
        offers = report.offers_read,
        rows = report.rows_written,
        rejected = report.rejected_ids.len(),
        exact = report.adjustments.exact,
        placement = report.adjustments.placement,
        merchant_average = report.adjustments.merchant_average,
        fallback = report.adjustments.fallback,
        "feed file written"
    );
    Ok(report)
}
