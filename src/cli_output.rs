// Terminal rendering for the analyze/rules/cache commands
use colored::Colorize;
use comfy_table::presets::{ASCII_FULL, UTF8_FULL};
use comfy_table::Table;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::{self, IsTerminal};

use crate::complexity::DeveloperRank;
use crate::report::AnalysisResult;
use crate::scoring::{SkillScore, Tier};

/// Output mode for CLI commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Colors and box-drawing tables
    Human,
    /// Machine-readable JSON output
    Json,
    /// Plain text without colors (for pipes/logs)
    Plain,
}

impl OutputMode {
    /// Auto-detect output mode based on environment
    pub fn auto() -> Self {
        if std::env::var("SKILLLENS_JSON").is_ok() {
            Self::Json
        } else if !io::stdout().is_terminal() {
            Self::Plain
        } else {
            Self::Human
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "human" => Some(Self::Human),
            "json" => Some(Self::Json),
            "plain" | "text" => Some(Self::Plain),
            _ => None,
        }
    }
}

/// CLI output writer with mode awareness
pub struct OutputWriter {
    mode: OutputMode,
}

impl OutputWriter {
    pub fn new(mode: OutputMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    /// Print a section header
    pub fn section(&self, title: &str) {
        match self.mode {
            OutputMode::Human => {
                println!();
                println!("{}", title.cyan().bold());
                println!("{}", "═".repeat(title.chars().count()).cyan());
            }
            OutputMode::Plain => {
                println!();
                println!("{}", title);
                println!("{}", "=".repeat(title.chars().count()));
            }
            OutputMode::Json => {}
        }
    }

    pub fn success(&self, message: &str) {
        match self.mode {
            OutputMode::Human => println!("  {} {}", "✓".green(), message),
            OutputMode::Plain => println!("  [OK] {}", message),
            OutputMode::Json => {}
        }
    }

    pub fn warning(&self, message: &str) {
        match self.mode {
            OutputMode::Human => println!("  {} {}", "⚠".yellow(), message),
            OutputMode::Plain => println!("  [WARN] {}", message),
            OutputMode::Json => {}
        }
    }

    pub fn info(&self, message: &str) {
        if self.mode != OutputMode::Json {
            println!("  {}", message);
        }
    }

    /// Print a key-value table
    pub fn table(&self, rows: &[(&str, String)]) {
        let max_key_len = rows.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
        match self.mode {
            OutputMode::Human => {
                for (key, value) in rows {
                    println!("  {:width$} │ {}", key.yellow(), value, width = max_key_len);
                }
            }
            OutputMode::Plain => {
                for (key, value) in rows {
                    println!("  {:width$} : {}", key, value, width = max_key_len);
                }
            }
            OutputMode::Json => {}
        }
    }

    /// Print horizontal bar chart
    pub fn bar_chart(&self, label: &str, value: f64, max: f64, width: usize) {
        let ratio = if max > 0.0 { (value / max).clamp(0.0, 1.0) } else { 0.0 };
        let filled = ((ratio * width as f64) as usize).min(width);
        let bar = match self.mode {
            OutputMode::Human => format!("{}{}", "█".repeat(filled).cyan(), "░".repeat(width - filled)),
            OutputMode::Plain => format!("{}{}", "#".repeat(filled), "-".repeat(width - filled)),
            OutputMode::Json => return,
        };

        println!("  {} │{} {:.1}%", label, bar, ratio * 100.0);
    }

    /// Pretty JSON on stdout; only prints in JSON mode.
    pub fn json<T: Serialize>(&self, value: &T) {
        if self.mode == OutputMode::Json {
            if let Ok(json) = serde_json::to_string_pretty(value) {
                println!("{}", json);
            }
        }
    }

    pub fn analysis(&self, result: &AnalysisResult) {
        self.section(&format!("Skill analysis: {}", result.filename));

        if let Some(error) = &result.error {
            self.warning(error);
            return;
        }

        let libraries = if result.libraries.is_empty() {
            "none detected".to_string()
        } else {
            result.libraries.iter().cloned().collect::<Vec<_>>().join(", ")
        };
        self.table(&[
            ("Language", result.primary_language.to_string()),
            ("Libraries", libraries),
            ("Recommended", result.recommendations.join(", ")),
        ]);

        if result.skills.is_empty() {
            self.info("No categorized skills found");
            return;
        }

        self.section("Skills");
        for skill in &result.skills {
            self.bar_chart(&format!("{:<18}", skill.name), skill.score, 1.0, 30);
        }
        self.skill_table(&result.skills);
    }

    fn skill_table(&self, skills: &[SkillScore]) {
        if self.mode == OutputMode::Json {
            return;
        }

        let mut table = Table::new();
        table
            .load_preset(if self.mode == OutputMode::Human { UTF8_FULL } else { ASCII_FULL })
            .set_header(vec!["Skill", "Score", "Level", "Start here"]);

        for skill in skills {
            let first_resource = skill
                .learning_resources
                .as_ref()
                .and_then(|r| r.first())
                .map(|r| format!("{} ({})", r.title, r.url))
                .unwrap_or_default();
            table.add_row(vec![
                skill.name.clone(),
                format!("{:.0}%", skill.score * 100.0),
                Tier::from_percent(skill.score * 100.0).to_string(),
                first_resource,
            ]);
        }

        println!("{table}");
    }

    pub fn rank(&self, rank: &DeveloperRank) {
        self.section("Developer rank");
        let label = match self.mode {
            OutputMode::Human => rank.rank.to_string().green().bold().to_string(),
            _ => rank.rank.to_string(),
        };
        self.table(&[
            ("Complexity", format!("{:.1}", rank.complexity_score)),
            ("Diversity", rank.diversity_score.to_string()),
            ("Rank", label),
        ]);
    }

    pub fn signals(&self, skills: &BTreeMap<String, f64>) {
        self.section("Skill signals");
        if skills.is_empty() {
            self.info("No signals detected");
            return;
        }

        let mut ordered: Vec<(&String, &f64)> = skills.iter().collect();
        ordered.sort_by(|a, b| b.1.partial_cmp(a.1).unwrap_or(std::cmp::Ordering::Equal));
        for (skill, confidence) in ordered {
            self.bar_chart(&format!("{:<18}", skill), *confidence, 1.0, 20);
        }
    }
}

/// Format file size in human-readable form
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes < KB {
        format!("{} B", bytes)
    } else if bytes < MB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else if bytes < GB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    }
}
