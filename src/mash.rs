use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::PangbankError;

const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(600);

/// One row of `mash dist` output: reference, query, distance, p-value,
/// shared-hashes.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceResult {
    pub reference_id: String,
    pub query_id: String,
    pub distance: f64,
    pub p_value: f64,
    pub shared_hashes: String,
}

pub trait SketchTool: Send + Sync {
    fn check_available(&self) -> Result<(), PangbankError>;
    fn sketch(&self, genome: &Path, out_dir: &Path) -> Result<PathBuf, PangbankError>;
    fn distance(
        &self,
        query_sketch: &Path,
        reference_db: &Path,
    ) -> Result<Vec<DistanceResult>, PangbankError>;
}

#[derive(Clone)]
pub struct MashTool {
    binary: Option<PathBuf>,
    timeout: Duration,
}

impl MashTool {
    pub fn new() -> Self {
        Self {
            binary: find_in_path("mash"),
            timeout: DEFAULT_TOOL_TIMEOUT,
        }
    }

    pub fn new_with_binary(binary: PathBuf) -> Self {
        Self {
            binary: Some(binary),
            timeout: DEFAULT_TOOL_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn require_binary(&self) -> Result<&PathBuf, PangbankError> {
        self.binary
            .as_ref()
            .ok_or_else(|| PangbankError::MissingTool("mash".to_string()))
    }

    fn run_mash(&self, args: &[String]) -> Result<Output, PangbankError> {
        let binary = self.require_binary()?;
        let mut child = Command::new(binary)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| PangbankError::ToolExecution {
                tool: "mash".to_string(),
                message: err.to_string(),
            })?;

        let deadline = Instant::now() + self.timeout;
        loop {
            match child.try_wait() {
                Ok(Some(_)) => break,
                Ok(None) => {
                    if Instant::now() >= deadline {
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(PangbankError::ToolTimeout(format!(
                            "mash {} exceeded {}s",
                            args.first().map(String::as_str).unwrap_or(""),
                            self.timeout.as_secs()
                        )));
                    }
                    thread::sleep(Duration::from_millis(50));
                }
                Err(err) => {
                    return Err(PangbankError::ToolExecution {
                        tool: "mash".to_string(),
                        message: err.to_string(),
                    });
                }
            }
        }

        let output = child
            .wait_with_output()
            .map_err(|err| PangbankError::ToolExecution {
                tool: "mash".to_string(),
                message: err.to_string(),
            })?;
        if output.status.success() {
            return Ok(output);
        }
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let message = if stderr.is_empty() {
            format!("mash exited with {}", output.status)
        } else {
            stderr
        };
        Err(PangbankError::ToolExecution {
            tool: "mash".to_string(),
            message,
        })
    }
}

impl Default for MashTool {
    fn default() -> Self {
        Self::new()
    }
}

impl SketchTool for MashTool {
    fn check_available(&self) -> Result<(), PangbankError> {
        self.require_binary().map(|_| ())
    }

    fn sketch(&self, genome: &Path, out_dir: &Path) -> Result<PathBuf, PangbankError> {
        validate_genome_file(genome)?;
        let stem = genome
            .file_stem()
            .and_then(|value| value.to_str())
            .unwrap_or("query");
        let out_prefix = out_dir.join(stem);
        let args = vec![
            "sketch".to_string(),
            "-o".to_string(),
            out_prefix.to_string_lossy().to_string(),
            genome.to_string_lossy().to_string(),
        ];
        self.run_mash(&args)?;

        let sketch_path = out_prefix.with_extension("msh");
        if !sketch_path.exists() {
            return Err(PangbankError::ToolExecution {
                tool: "mash".to_string(),
                message: format!("sketch did not produce {}", sketch_path.display()),
            });
        }
        Ok(sketch_path)
    }

    fn distance(
        &self,
        query_sketch: &Path,
        reference_db: &Path,
    ) -> Result<Vec<DistanceResult>, PangbankError> {
        let args = vec![
            "dist".to_string(),
            reference_db.to_string_lossy().to_string(),
            query_sketch.to_string_lossy().to_string(),
        ];
        let output = self.run_mash(&args)?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_dist_output(&stdout)
    }
}

pub fn validate_genome_file(genome: &Path) -> Result<(), PangbankError> {
    if !genome.is_file() {
        return Err(PangbankError::InvalidGenome(format!(
            "{} is not a readable file",
            genome.display()
        )));
    }
    let empty = std::fs::metadata(genome)
        .map(|meta| meta.len() == 0)
        .unwrap_or(true);
    if empty {
        return Err(PangbankError::InvalidGenome(format!(
            "{} is empty",
            genome.display()
        )));
    }
    Ok(())
}

pub fn parse_dist_output(stdout: &str) -> Result<Vec<DistanceResult>, PangbankError> {
    let mut results = Vec::new();
    for line in stdout.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 5 {
            return Err(PangbankError::DistParse(format!(
                "expected 5 tab-separated columns, got {}: {line}",
                fields.len()
            )));
        }
        let distance: f64 = fields[2]
            .parse()
            .map_err(|_| PangbankError::DistParse(format!("bad distance value: {}", fields[2])))?;
        let p_value: f64 = fields[3]
            .parse()
            .map_err(|_| PangbankError::DistParse(format!("bad p-value: {}", fields[3])))?;
        results.push(DistanceResult {
            reference_id: fields[0].to_string(),
            query_id: fields[1].to_string(),
            distance,
            p_value,
            shared_hashes: fields[4].to_string(),
        });
    }
    Ok(results)
}

fn find_in_path(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    for path in std::env::split_paths(&path_var) {
        let exe = path.join(format!("{name}.exe"));
        if exe.exists() {
            return Some(exe);
        }
        let plain = path.join(name);
        if plain.exists() {
            return Some(plain);
        }
    }
    None
}
