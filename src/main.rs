fn main() {
    match cashmemo_storage_lib::run() {
        Ok(response) => {
            let ok = response.ok;
            match serde_json::to_string_pretty(&response) {
                Ok(json) => println!("{}", json),
                Err(e) => eprintln!("[Storage] Failed to serialize response: {}", e),
            }
            if !ok {
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(2);
        }
    }
}
