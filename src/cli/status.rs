use crate::db::get_connection;
use crate::error::Result;
use crate::settings::load_settings;

pub fn run() -> Result<()> {
    let settings = load_settings();
    let db_path = settings.db_path();

    println!("Data dir:   {}", settings.data_dir);
    println!("Database:   {}", db_path.display());
    println!("Upload cap: {} bytes, {} rows", settings.max_upload_bytes, settings.max_rows);

    if db_path.exists() {
        let conn = get_connection(&db_path)?;
        let types: i64 = conn.query_row("SELECT count(*) FROM assistance_types", [], |r| r.get(0))?;
        let campaigns: i64 = conn.query_row("SELECT count(*) FROM campaigns", [], |r| r.get(0))?;
        let beneficiaries: i64 = conn.query_row(
            "SELECT count(*) FROM beneficiaries WHERE deleted_at IS NULL",
            [],
            |r| r.get(0),
        )?;
        let imports: i64 = conn.query_row("SELECT count(*) FROM imports", [], |r| r.get(0))?;

        println!();
        println!("Assistance types: {types}");
        println!("Campaigns:        {campaigns}");
        println!("Beneficiaries:    {beneficiaries}");
        println!("Imports:          {imports}");
    } else {
        println!();
        println!("Database not found. Run `upas init` to set up.");
    }
    Ok(())
}
