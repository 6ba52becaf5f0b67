//! Terminal output formatting.

use colored::{ColoredString, Colorize};
use tessera_core::WidgetDefinition;
use tessera_engine::RenderResult;

/// Print a render result for one widget.
pub fn print_render_result(definition: &WidgetDefinition, result: &RenderResult) {
    println!(
        "{} {} {}",
        definition.name.cyan().bold(),
        format!("#{}", definition.id).dimmed(),
        kind_label(result)
    );
    println!();

    match result {
        RenderResult::Html { html, css } => {
            println!("{}", html);
            if let Some(css) = css {
                println!();
                println!("{}", "Scoped CSS".bold());
                println!("{}", css.as_str().dimmed());
            }
        }
        RenderResult::Text { html, .. } | RenderResult::ApiHtml { html } => println!("{}", html),
        RenderResult::Iframe { src, sandbox } => {
            println!("{}: {}", "Source".bold(), src);
            println!("{}: {}", "Sandbox".bold(), sandbox.join(" "));
        }
        RenderResult::ApiJson { json } => println!("{}", json),
        RenderResult::Chart { chart, rows } => {
            println!("{}: {:?}", "Chart".bold(), chart);
            println!();
            println!("{:<30} {:>12}", "Category", "Value");
            println!("{}", "-".repeat(43));
            for row in rows {
                println!("{:<30} {:>12}", truncate(&row.category, 28), row.value);
            }
        }
        RenderResult::Empty { message } => println!("{}", message.dimmed()),
        RenderResult::Unknown { widget_type } => {
            println!("{}", format!("Unknown widget type: {}", widget_type).yellow())
        }
        RenderResult::Error { message } => println!("{}", message.red()),
        RenderResult::Fallback { reason, raw } => {
            println!("{}", reason.red());
            println!();
            println!("{}", raw);
        }
    }
}

fn kind_label(result: &RenderResult) -> ColoredString {
    let label = format!("[{}]", result.kind());
    match result {
        RenderResult::Error { .. } | RenderResult::Fallback { .. } => label.red(),
        RenderResult::Empty { .. } | RenderResult::Unknown { .. } => label.yellow(),
        _ => label.green(),
    }
}

/// Print widget definitions as a table.
pub fn print_widgets_table(widgets: &[WidgetDefinition]) {
    if widgets.is_empty() {
        println!("{}", "No widgets found.".dimmed());
        return;
    }

    println!("{:<8} {:<10} {:<32} {:<10}", "ID", "Type", "Name", "Refresh");
    println!("{}", "-".repeat(62));

    for widget in widgets {
        let refresh = widget
            .refresh_interval
            .filter(|secs| *secs > 0)
            .map(|secs| format!("{}s", secs))
            .unwrap_or_else(|| "-".to_string());

        println!(
            "{:<8} {:<10} {:<32} {:<10}",
            widget.id,
            widget.kind.as_str(),
            truncate(&widget.name, 30),
            refresh
        );
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}
