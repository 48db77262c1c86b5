use comfy_table::{Cell, Table};

use crate::cli::open_db;
use crate::db::find_campaign;
use crate::error::Result;
use crate::headers::template_columns;

pub fn run(campaign: &str, output: Option<String>) -> Result<()> {
    let conn = open_db()?;
    let campaign = find_campaign(&conn, campaign)?;
    let columns = template_columns(&campaign.assistance);
    let path = output.unwrap_or_else(|| format!("template-{}.csv", campaign.id));

    let mut writer = csv::Writer::from_path(&path)?;
    writer.write_record(columns.iter().map(|spec| spec.column.key()))?;
    writer.flush()?;

    let mut table = Table::new();
    table.set_header(vec!["Column", "Requirement", "Description"]);
    for spec in &columns {
        table.add_row(vec![
            Cell::new(spec.column.key()),
            Cell::new(spec.requirement.label()),
            Cell::new(spec.column.description()),
        ]);
    }
    println!("{} ({})\n{table}", campaign.name, campaign.assistance.name);
    println!("Template written to {path}");
    Ok(())
}
