use notmnist::config::PipelineConfig;
use notmnist::pipeline;
use notmnist::util::simple_logger;

fn main() {
    simple_logger::init_from_env();

    let mut config_path: Option<String> = None;
    let mut data_root: Option<String> = None;
    let mut force = false;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => config_path = args.next(),
            "--data-root" => data_root = args.next(),
            "--force" => force = true,
            other => {
                eprintln!("unknown argument: {other}");
                eprintln!("usage: prepare [--config <path>] [--data-root <dir>] [--force]");
                std::process::exit(2);
            }
        }
    }

    let mut cfg = match config_path {
        Some(path) => match PipelineConfig::from_path(&path) {
            Some(cfg) => cfg,
            None => {
                eprintln!("could not load config from {path}");
                std::process::exit(2);
            }
        },
        None => PipelineConfig::default(),
    };
    if let Some(root) = data_root {
        cfg.data_root = root.into();
    }

    match pipeline::prepare(&cfg, force) {
        Ok(data) => {
            println!(
                "training: {:?} {:?}",
                data.train.images.dim(),
                data.train.labels.dim()
            );
            println!(
                "validation: {:?} {:?}",
                data.valid.images.dim(),
                data.valid.labels.dim()
            );
            println!(
                "testing: {:?} {:?}",
                data.test.images.dim(),
                data.test.labels.dim()
            );
            println!(
                "train labels per class: {:?}",
                data.train.label_counts(cfg.num_classes)
            );
        }
        Err(e) => {
            eprintln!("pipeline failed: {e}");
            std::process::exit(1);
        }
    }
}
