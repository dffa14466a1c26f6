#![forbid(unsafe_code)]

fn main() {
    let (json, outcome) = pem_cli::run_from_env();
    if let Err(error) = outcome {
        if json {
            eprintln!(
                "{}",
                serde_json::json!({
                    "status": "error",
                    "kind": error.kind(),
                    "error": error.to_string(),
                    "exit_code": error.exit_code(),
                })
            );
        } else {
            eprintln!("error: {error}");
        }
        std::process::exit(error.exit_code());
    }
}
