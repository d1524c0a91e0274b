use super::helpers::{json_error, parse_date};
use anyhow::Result;
use larder_core::service::LarderService;
use std::process;

pub(crate) fn cmd_note(
    service: &LarderService,
    text: Option<String>,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    let date = parse_date(date)?;

    if let Some(text) = text {
        let note = service.save_note(Some(date), &text)?;
        if json {
            println!("{}", serde_json::to_string_pretty(&note)?);
        } else {
            println!("Saved note for {}.", note.note_date);
        }
        return Ok(());
    }

    match service.daily_note(Some(date))? {
        Some(note) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&note)?);
            } else {
                println!("{}", note.comment);
                if note.note_date != date.to_string() {
                    println!("(carried over from {})", note.note_date);
                }
            }
        }
        None => {
            if json {
                println!("{}", json_error(&format!("No note for {date}")));
            } else {
                eprintln!("No note for {date}.");
            }
            process::exit(2);
        }
    }
    Ok(())
}
