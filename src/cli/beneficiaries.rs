use comfy_table::{Cell, Table};

use crate::cli::open_db;
use crate::db::{find_campaign, get_campaign_beneficiaries};
use crate::error::Result;

pub fn list(campaign: &str) -> Result<()> {
    let conn = open_db()?;
    let campaign = find_campaign(&conn, campaign)?;
    let rows = get_campaign_beneficiaries(&conn, campaign.id)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Nom", "Prénom", "Sexe", "Naissance", "Téléphone", "Latéralité", "Scolarisés"]);
    for b in &rows {
        table.add_row(vec![
            Cell::new(b.id),
            Cell::new(&b.last_name),
            Cell::new(&b.first_name),
            Cell::new(&b.sex),
            Cell::new(b.birth_date.as_deref().unwrap_or("")),
            Cell::new(&b.phone),
            Cell::new(b.laterality.as_deref().unwrap_or("")),
            Cell::new(match b.schooling {
                Some(true) => "oui",
                Some(false) => "non",
                None => "",
            }),
        ]);
    }
    println!("{} ({} beneficiaries)\n{table}", campaign.name, rows.len());
    Ok(())
}
