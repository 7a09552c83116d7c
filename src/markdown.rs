use crate::report::HardwareReport;
use chrono::{DateTime, Local};

pub fn render_markdown(rep: &HardwareReport, generated: DateTime<Local>, platform: &str) -> String {
    let mut s = String::new();
    s.push_str("# Hardware Report\n\n");
    s.push_str(&format!("Generated: {}\n\n", generated.format("%Y-%m-%d %H:%M")));
    s.push_str(&format!("Platform: {}\n\n", platform));
    let view = rep.view();
    if view.is_empty() { s.push_str("No hardware information collected.\n"); return s; }
    for cat in view {
        s.push_str(&format!("## {}\n", cat.name));
        for (name, fields) in &cat.entries {
            match name {
                Some(n) => {
                    s.push_str(&format!("### {}\n", n.replace('\n', " ")));
                    for (k, v) in fields { s.push_str(&format!("- {}: {}\n", k, v)); }
                }
                None => { for (k, v) in fields { s.push_str(&format!("- {}: {}\n", k, v)); } }
            }
        }
        s.push('\n');
    }
    s
}
