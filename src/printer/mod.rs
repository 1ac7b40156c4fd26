//! Printers: colored status text and markdown (termimad) report rendering.

use owo_colors::OwoColorize;
use termimad::MadSkin;

/// Semantic colored output for the batch front-end.
pub struct TextPrinter;

impl TextPrinter {
    pub fn heading(text: &str) {
        println!("{}", text.cyan().bold());
    }

    pub fn success(text: &str) {
        println!("{}", text.green());
    }

    pub fn failure(text: &str) {
        println!("{}", text.red());
    }

    pub fn note(text: &str) {
        println!("{}", text.yellow());
    }

    pub fn plain(text: &str) {
        println!("{}", text);
    }
}

pub struct MarkdownPrinter {
    pub skin: MadSkin,
}

impl Default for MarkdownPrinter {
    fn default() -> Self {
        Self { skin: MadSkin::default() }
    }
}

impl MarkdownPrinter {
    pub fn print(&self, text: &str) {
        self.skin.print_text(text);
        println!();
    }
}
