use comfy_table::{Cell, Table};

use crate::cli::open_db;
use crate::db;
use crate::error::Result;

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

pub fn add(name: &str, laterality_required: bool, schooling_required: bool) -> Result<()> {
    let conn = open_db()?;
    let id = db::add_assistance_type(&conn, name, laterality_required, schooling_required)?;
    println!("Added assistance type #{id}: {name}");
    Ok(())
}

pub fn list() -> Result<()> {
    let conn = open_db()?;
    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Laterality", "Schooling (minors)"]);
    for t in db::list_assistance_types(&conn)? {
        table.add_row(vec![
            Cell::new(t.id),
            Cell::new(&t.name),
            Cell::new(yes_no(t.laterality_required)),
            Cell::new(yes_no(t.schooling_required)),
        ]);
    }
    println!("Assistance types\n{table}");
    Ok(())
}
