fn main() -> anyhow::Result<()> {
    notes_web::cli::run()
}
