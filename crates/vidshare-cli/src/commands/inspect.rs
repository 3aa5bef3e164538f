//! Inspect command implementation.

use anyhow::{bail, Result};

use vidshare_core::descriptor::{self, ShareDescriptor};
use vidshare_core::file::format_size;

use super::InspectArgs;

/// Run the inspect command.
pub async fn run(args: InspectArgs) -> Result<()> {
    let raw = super::read_descriptor_input(&args.descriptor).await?;

    match descriptor::decode(&raw) {
        Ok(descriptor) if args.json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "valid": true,
                    "offline": descriptor.is_offline(),
                    "link": descriptor.link(),
                    "descriptor": descriptor,
                }))?
            );
            Ok(())
        }
        Ok(descriptor) => {
            print_details(&descriptor);
            Ok(())
        }
        Err(rejected) => {
            if args.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&serde_json::json!({
                        "valid": false,
                        "reason": rejected.reason,
                    }))?
                );
            }
            bail!("Descriptor rejected: {}", rejected.reason)
        }
    }
}

fn print_details(descriptor: &ShareDescriptor) {
    let video = &descriptor.video;
    println!();
    println!("  Title:     {}", video.title);
    println!("  Size:      {} ({} bytes)", format_size(video.file_size), video.file_size);
    println!("  URL:       {}", video.server_url);
    println!("  Sender:    {} ({})", descriptor.sender_device.name, descriptor.sender_device.platform);
    println!("  Session:   {}", video.id);
    println!("  Checksum:  {}", video.checksum.as_deref().unwrap_or("none"));
    match &descriptor.hotspot {
        Some(hotspot) => println!(
            "  Network:   {} ({})",
            hotspot.ssid,
            if hotspot.is_secured { "secured" } else { "open" }
        ),
        None => println!("  Network:   same network as sender"),
    }
    println!("  Link:      {}", descriptor.link());
    println!();
}
