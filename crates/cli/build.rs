use std::{env, fs, path::PathBuf};

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=OUT_DIR");

    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let completions_dir = out_dir.join("completions");

    fs::create_dir_all(&completions_dir).unwrap();

    let mut cmd = clap::Command::new("pagedoc")
        .version(env!("CARGO_PKG_VERSION"))
        .author("PageDoc Contributors")
        .about("Extract deterministic document trees from web pages and APIs")
        .arg(clap::arg!(<INPUT> "URL to fetch, local file, or '-' for stdin"))
        .arg(
            clap::arg!(--mode <MODE> "Extraction mode")
                .default_value("auto")
                .value_parser(["auto", "thread", "article"]),
        )
        .arg(clap::arg!(--json "Print the PageDoc as JSON"))
        .arg(clap::arg!(--explain "Print the decision trace"))
        .arg(clap::arg!(--rendered "Render with the browser before extracting"))
        .arg(clap::arg!(--no_fallback "Never escalate thin pages to the browser"))
        .arg(clap::arg!(--max_depth <N> "Drop thread items deeper than this"))
        .arg(clap::arg!(--max_length <N> "Truncate text longer than this many characters"))
        .arg(clap::arg!(--timeout <SECS> "Timeout for the whole run in seconds").default_value("30"))
        .arg(
            clap::arg!(--patterns_dir <DIR> "Extra pattern pack directory")
                .value_name("DIR")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(
            clap::arg!(--state_file <FILE> "Domain state file")
                .value_name("FILE")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(clap::arg!(-v --verbose "Enable debug logging"));

    clap_complete::generate_to(clap_complete::shells::Bash, &mut cmd, "pagedoc", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::Zsh, &mut cmd, "pagedoc", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::Fish, &mut cmd, "pagedoc", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::PowerShell, &mut cmd, "pagedoc", &completions_dir).unwrap();

    println!("cargo:warning=Shell completions generated in: {}", completions_dir.display());
}
