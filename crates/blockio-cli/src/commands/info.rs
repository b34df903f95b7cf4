//! Shows the active device's configuration.

use anyhow::Result;

use super::Target;
use crate::style::print_info_table;

pub fn run(target: &Target) -> Result<()> {
    let trampoline = target.trampoline()?;

    let entries = [
        ("Device", trampoline.device_type().unwrap_or_default()),
        ("Block size", trampoline.get_block_size()?.to_string()),
        ("Queue depth", trampoline.get_queue_depth()?.to_string()),
        ("Single submit", trampoline.get_single_submit()?.to_string()),
        ("Overlap events", trampoline.get_overlap_events()?.to_string()),
        ("Threads", trampoline.get_thread_count()?.to_string()),
        (
            "Locked buffers",
            trampoline.locked_buffer_policy().to_string(),
        ),
        (
            "Plugins root",
            trampoline.loader().resolver().root().display().to_string(),
        ),
    ];
    print_info_table(&entries);
    Ok(())
}
