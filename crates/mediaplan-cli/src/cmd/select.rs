use std::error::Error;

use mediaplan_core::scratch::{pull_from_scratch, ScratchRequest};
use mediaplan_core::select::{AppendRequest, MediaAllocator, VolumeCheck};
use mediaplan_types::JobId;

use crate::cmd::pools::pool_name;
use crate::dispatch::Session;
use crate::table::CliTableTheme;

pub(crate) struct SelectArgs<'a> {
    pub pool: &'a str,
    pub storage: &'a str,
    pub job: u32,
    pub count: u32,
    pub create: bool,
    pub prune: bool,
    pub json: bool,
}

pub(crate) fn run_select(session: &Session, args: &SelectArgs<'_>) -> Result<(), Box<dyn Error>> {
    let storage = session.storage(args.storage)?;
    let allocator = MediaAllocator::new(&session.catalog);

    let selected = {
        let mut job = allocator.start_job(JobId(args.job));
        let mut volumes = Vec::new();
        let mut outcome = Ok(());
        for index in 1..=args.count.max(1) {
            let req = AppendRequest::new(args.pool, storage, index)
                .create(args.create)
                .prune(args.prune);
            match job.select_for_append(&req) {
                Ok(volume) => volumes.push(volume),
                Err(e) => {
                    outcome = Err(e);
                    break;
                }
            }
        }
        outcome.map(|()| volumes)
    };
    // Pruning and labelling may have changed the catalog even on failure.
    session.save()?;
    let volumes = selected?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&volumes)?);
        return Ok(());
    }
    let theme = CliTableTheme::detect();
    println!("{}", theme.volume_table(&volumes, |v| pool_name(session, v)));
    Ok(())
}

pub(crate) fn run_scratch(
    session: &Session,
    pool: &str,
    storage: &str,
    in_changer: bool,
) -> Result<(), Box<dyn Error>> {
    let storage = session.storage(storage)?;
    let pool = session.pool(pool)?;
    let req = ScratchRequest {
        pool: &pool,
        media_type: &storage.media_type,
        storage: storage.group(),
        in_changer,
        exclude: &[],
    };
    let volume = pull_from_scratch(&session.catalog, &req)?;
    session.save()?;

    println!("Moved volume '{}' into pool '{}'", volume.name, pool.name);
    println!();
    println!("{}", CliTableTheme::detect().volume_details(&volume, &pool.name));
    Ok(())
}

pub(crate) fn run_check_volume(
    session: &Session,
    volume: &str,
    pool: &str,
    storage: &str,
    job: u32,
) -> Result<(), Box<dyn Error>> {
    let storage = session.storage(storage)?;
    let allocator = MediaAllocator::new(&session.catalog);
    let check = {
        let mut job = allocator.start_job(JobId(job));
        let req = AppendRequest::new(pool, storage, 1);
        job.check_volume_for_append(volume, &req)?
    };
    session.save()?;

    match check {
        VolumeCheck::Usable(vol) => {
            println!("Volume '{}' can be appended to ({})", vol.name, vol.status);
            Ok(())
        }
        VolumeCheck::Rejected { reason } => Err(format!("volume rejected: {reason}").into()),
    }
}
