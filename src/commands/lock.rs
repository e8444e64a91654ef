//! The `lock status` and `lock clear` commands.

use crate::cli::{LockClearArgs, LockTargetArgs};
use crate::config::Settings;
use crate::error::{Result, StorageError};
use crate::locks::{self, LockInfo};

pub fn cmd_lock_status(target: &LockTargetArgs, settings: &Settings) -> Result<()> {
    let Some(info) = locks::inspect_lock(&target.storage, settings.stale_threshold())? else {
        println!("No active lock on {}.", target.storage.display());
        return Ok(());
    };

    print_lock_details(&info);
    if info.is_stale {
        println!();
        println!(
            "Note: the next acquirer will reclaim this lock. Use \
             `invoke-storage lock clear --storage {} --force` to clear it now.",
            target.storage.display()
        );
    }
    Ok(())
}

pub fn cmd_lock_clear(args: &LockClearArgs) -> Result<()> {
    if !args.force {
        return Err(StorageError::UserError(format!(
            "refusing to clear lock without --force flag.\n\n\
             Clearing the lock while its holder is alive lets two workers write the \
             storage root at once. Only clear it if the holder has crashed.\n\n\
             To clear the lock, run:\n  invoke-storage lock clear --storage {} --force",
            args.target.storage.display()
        )));
    }

    match locks::clear_lock(&args.target.storage)? {
        Some(info) => {
            println!("Cleared lock:");
            print_lock_details(&info);
        }
        None => println!("No lock found on {}.", args.target.storage.display()),
    }
    Ok(())
}

fn print_lock_details(info: &LockInfo) {
    println!("  Path:       {}", info.path.display());
    match &info.metadata {
        Some(meta) => {
            println!("  Owner:      {}", meta.owner);
            println!("  PID:        {}", meta.owner_id);
            println!(
                "  Heartbeat:  {}",
                meta.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
            );
            println!("  Age:        {}", meta.age_string());
        }
        None => println!("  Heartbeat:  missing"),
    }
    if info.is_stale {
        println!("  Status:     STALE");
    }
}
