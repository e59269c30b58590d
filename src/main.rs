fn main() -> anyhow::Result<()> {
    gesturenav::logging::init();
    gesturenav::cli::run()
}
