//! Config command implementation.

use crate::config::Config;

/// Show the effective configuration.
pub fn show(config: &Config) {
    println!("Code Checker Configuration");
    println!("{:-<40}", "");
    println!("Test Folder:       {}", config.test_folder.display());
    println!("Timeout:           {} s", config.timeout_secs);
    println!("Max Depth:         {}", config.max_depth);
    println!("Hint Threshold:    {} tests", config.hint_threshold);
    println!("Keep Temp Files:   {}", config.keep_temp_files);
    println!("Log Level:         {}", config.log_level);

    if let Some(config_path) = Config::config_file_path() {
        println!("\nConfig file: {}", config_path.display());
    }
}
