use parking_lot::Mutex;
use std::io::Write;

pub struct BufferedLog {
    pub log_id: String,
    pub log_file_path: String,
    pub buffered_log: Mutex<Vec<String>>,
    pub log_count_flush: usize,
}

impl BufferedLog {
    pub fn new(id: String, full_file_path: String) -> Result<Self, std::io::Error> {
        let buffered_log = BufferedLog {
            log_id: id,
            log_file_path: full_file_path,
            buffered_log: Mutex::new(Vec::new()),
            log_count_flush: 50,
        };

        // Create the log file and path if it does not exist
        if let Some(parent) = std::path::Path::new(&buffered_log.log_file_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::OpenOptions::new().create(true).append(true).open(&buffered_log.log_file_path)?;

        Ok(buffered_log)
    }

    pub fn add_log(&self, log: String) {
        self.buffered_log.lock().push(log);
    }

    // Writes the buffered lines once enough have piled up, or always when forced
    pub fn consider_flush(&self, force: bool) {
        let mut log_buffer = self.buffered_log.lock();
        if log_buffer.is_empty() || (!force && log_buffer.len() < self.log_count_flush) {
            return;
        }

        let log_data = log_buffer.join("\n") + "\n";
        if let Err(e) = std::fs::OpenOptions::new()
            .append(true)
            .open(&self.log_file_path)
            .and_then(|mut file| file.write_all(log_data.as_bytes()))
        {
            eprintln!("Failed to write log for log id {}: {}", &self.log_id, e);
        }

        log_buffer.clear();
    }
}
