use std::error::Error;

use comfy_table::Cell;

use mediaplan_core::bootstrap::{build_manifest, complete_restore_sets, RestoreContext};
use mediaplan_types::JobId;

use crate::dispatch::Session;
use crate::table::CliTableTheme;

/// Which files of one job to restore.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Selection {
    All,
    Ranges(Vec<(i32, i32)>),
}

/// Parse `JOBID:all` or `JOBID:RANGE[,RANGE...]` where a range is `N` or `N-M`.
fn parse_selection(raw: &str) -> Result<(JobId, Selection), String> {
    let (job, ranges) = raw
        .split_once(':')
        .ok_or_else(|| format!("invalid selection '{raw}': expected JOBID:RANGES"))?;
    let job_id: JobId = job
        .trim()
        .parse()
        .map_err(|_| format!("invalid JobId in selection '{raw}'"))?;

    let ranges = ranges.trim();
    if ranges.eq_ignore_ascii_case("all") {
        return Ok((job_id, Selection::All));
    }

    let mut parsed = Vec::new();
    for part in ranges.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (first, last) = match part.split_once('-') {
            Some((a, b)) => (a.trim(), b.trim()),
            None => (part, part),
        };
        let first: i32 = first
            .parse()
            .map_err(|_| format!("invalid file index '{first}' in selection '{raw}'"))?;
        let last: i32 = last
            .parse()
            .map_err(|_| format!("invalid file index '{last}' in selection '{raw}'"))?;
        if first < 1 || last < first {
            return Err(format!("invalid range '{part}' in selection '{raw}'"));
        }
        parsed.push((first, last));
    }
    if parsed.is_empty() {
        return Err(format!("selection '{raw}' names no files"));
    }
    Ok((job_id, Selection::Ranges(parsed)))
}

fn restore_context(
    session: &Session,
    selections: &[String],
    regex: Option<&str>,
) -> Result<RestoreContext, Box<dyn Error>> {
    let mut ctx = RestoreContext::new();
    for raw in selections {
        let (job_id, selection) = parse_selection(raw)?;
        match selection {
            Selection::All => ctx.add_all(job_id),
            Selection::Ranges(ranges) => {
                for (first, last) in ranges {
                    ctx.add_file_range(job_id, first, last);
                }
            }
        }
    }
    if let Some(regex) = regex {
        let jobs: Vec<JobId> = ctx.job_ids().collect();
        for job_id in jobs {
            ctx.set_file_regex(job_id, regex);
        }
    }
    complete_restore_sets(&mut ctx, &session.catalog)?;
    Ok(ctx)
}

pub(crate) fn run_bootstrap(
    session: &Session,
    selections: &[String],
    jobs: &[u32],
    regex: Option<&str>,
    output: Option<&str>,
    json: bool,
) -> Result<(), Box<dyn Error>> {
    let ctx = restore_context(session, selections, regex)?;
    let order: Vec<JobId> = jobs.iter().copied().map(JobId).collect();
    let manifest = build_manifest(&ctx, &order, &session.config)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&manifest)?);
        return Ok(());
    }

    let Some(path) = output else {
        print!("{manifest}");
        return Ok(());
    };

    std::fs::write(path, manifest.to_string())
        .map_err(|e| format!("cannot write bootstrap to '{path}': {e}"))?;
    println!(
        "Wrote {path}: {} blocks, {} files",
        manifest.stanzas.len(),
        manifest.file_count
    );

    let volumes = manifest.required_volumes();
    if !volumes.is_empty() {
        let theme = CliTableTheme::detect();
        let mut table = theme.new_data_table(&["Volume", "Storage", "Media type", "In changer"]);
        for vol in &volumes {
            table.add_row(vec![
                Cell::new(&vol.volume),
                Cell::new(&vol.storage),
                Cell::new(&vol.media_type),
                Cell::new(if vol.in_changer { "yes" } else { "no" }),
            ]);
        }
        println!();
        println!("{table}");
    }
    Ok(())
}

pub(crate) fn run_scan(
    session: &Session,
    selections: &[String],
    json: bool,
) -> Result<(), Box<dyn Error>> {
    let ctx = restore_context(session, selections, None)?;

    if json {
        let items: Vec<_> = ctx.scan().collect();
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }
    for item in ctx.scan() {
        println!("{}\t{}\t{}", item.job_id, item.volume, item.range);
    }
    Ok(())
}
