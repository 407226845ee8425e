use sdfparse::{EntryKind, SdfFile};
use std::env;

fn main() {
    clilog::init_stderr_color_debug();
    let args: Vec<String> = env::args().collect();
    assert!(args.len() == 2,
            "Usage: {} <sdf_path>", args[0]);

    let sdf = match SdfFile::parse_file(&args[1]) {
        Ok(sdf) => sdf,
        Err(e) => panic!("{}", e)
    };

    clilog::info!("SDF file {}", args[1]);
    clilog::info!("VERSION {:?}", sdf.header.sdfversion);
    clilog::info!("DESIGN {:?}, CREATED BY {:?} {:?} {:?}",
                  sdf.header.design, sdf.header.vendor, sdf.header.program, sdf.header.version);
    match sdf.timescale_fs() {
        Ok(fs) => clilog::info!("TIMESCALE {:?} = {} fs", sdf.header.timescale, fs),
        Err(e) => clilog::warn!("{}", e),
    }
    clilog::info!("# Cell types = {}", sdf.cells.len());
    clilog::info!("# Instances = {}", sdf.num_instances());
    clilog::info!("# Entries = {}", sdf.num_entries());
    for kind in EntryKind::ALL {
        let n = sdf.entries().filter(|(_, _, e)| e.kind == kind).count();
        if n > 0 {
            clilog::info!("  {:<16} {}", kind.keyword(), n);
        }
    }
}
