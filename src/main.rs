//! gbpack CLI entry point.

mod cli;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn main() -> gbpack::Result<()> {
    cli::app()
}
