use clap::Parser;
use phloxer::cli::*;
use tracing_subscriber::EnvFilter;

fn main() {
	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::try_from_env("PHLOXER_LOG").unwrap_or_else(|_| EnvFilter::new("warn")))
		.with_writer(std::io::stderr)
		.init();

	let cli = Cli::parse();
	let phloxer = phloxer::Phloxer::new(cli.mode.options());

	match cli.mode {
		Mode::File { path, output, .. } => {
			let php = phloxer.compile_file(&path).unwrap_or_else(|e| {
				eprintln!("Failed compile file: {e}");
				std::process::exit(1);
			});
			match output {
				Some(output) => {
					if let Err(e) = std::fs::write(&output, php) {
						eprintln!("Failed write {}: {e}", output.display());
						std::process::exit(1);
					}
				}
				None => print!("{php}"),
			}
		}
		Mode::Ast { path, .. } => {
			let ast = phloxer.ast(&path).unwrap_or_else(|e| {
				eprintln!("Failed parse file: {e}");
				std::process::exit(1);
			});
			println!("{ast}");
		}
		Mode::Repl => phloxer.run_prompt(),
	}
}
