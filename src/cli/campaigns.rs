use chrono::NaiveDate;
use comfy_table::{Cell, Table};

use crate::cli::open_db;
use crate::db;
use crate::error::Result;

pub fn add(
    name: &str,
    assistance_type: &str,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<()> {
    let conn = open_db()?;
    let id = db::add_campaign(&conn, name, assistance_type, start, end)?;
    println!("Added campaign #{id}: {name} ({assistance_type})");
    Ok(())
}

fn day(d: Option<NaiveDate>) -> String {
    d.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default()
}

pub fn list() -> Result<()> {
    let conn = open_db()?;
    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Assistance type", "Start", "End", "Participants"]);
    for (campaign, participants) in db::list_campaigns(&conn)? {
        table.add_row(vec![
            Cell::new(campaign.id),
            Cell::new(&campaign.name),
            Cell::new(&campaign.assistance.name),
            Cell::new(day(campaign.start_date)),
            Cell::new(day(campaign.end_date)),
            Cell::new(participants),
        ]);
    }
    println!("Campaigns\n{table}");
    Ok(())
}
