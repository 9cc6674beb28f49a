//! Font import normalization for generated layout files.
//!
//! Generated layouts load Geist through the `geist` package, which is not part
//! of the exported dependency set. Those imports are rewritten to the
//! equivalent `next/font/google` loaders.

use regex::Regex;
use std::sync::LazyLock;

static GEIST_SANS_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^[ \t]*import\s*\{\s*GeistSans\s*\}\s*from\s*['"]geist/font/sans['"];?[ \t]*\r?\n?"#)
        .unwrap()
});

static GEIST_MONO_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^[ \t]*import\s*\{\s*GeistMono\s*\}\s*from\s*['"]geist/font/mono['"];?[ \t]*\r?\n?"#)
        .unwrap()
});

static GOOGLE_FONT_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^([ \t]*import\s*\{)([^}]*)(\}\s*from\s*['"]next/font/google['"])"#).unwrap()
});

// Whole import statements, including multi-line named imports.
static IMPORT_STATEMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?ms)^import\s(?:[^;'"]*?\sfrom\s)?\s*['"][^'"\n]+['"];?[ \t]*$"#).unwrap()
});

static GEIST_SANS_USAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bGeistSans\.").unwrap());

static GEIST_MONO_USAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bGeistMono\.").unwrap());

const SANS_DECLARATION: &str =
    "const geistSans = Geist({ subsets: ['latin'], variable: '--font-geist-sans' })";
const MONO_DECLARATION: &str =
    "const geistMono = Geist_Mono({ subsets: ['latin'], variable: '--font-geist-mono' })";

/// Whether `path` is a layout file whose fonts should be normalized.
pub fn is_layout_file(path: &str) -> bool {
    path == "app/layout.tsx" || path.ends_with("/layout.tsx")
}

/// Rewrite `geist` package font imports into `next/font/google` loaders.
///
/// Text without such imports is returned unchanged, so applying this twice
/// yields the same output as applying it once.
pub fn normalize_fonts(source: &str) -> String {
    let has_sans = GEIST_SANS_IMPORT.is_match(source);
    let has_mono = GEIST_MONO_IMPORT.is_match(source);
    if !has_sans && !has_mono {
        return source.to_string();
    }

    let mut text = GEIST_SANS_IMPORT.replace_all(source, "").into_owned();
    text = GEIST_MONO_IMPORT.replace_all(&text, "").into_owned();

    let mut names = Vec::new();
    let mut declarations = Vec::new();
    if has_sans {
        names.push("Geist");
        if !text.contains("const geistSans") {
            declarations.push(SANS_DECLARATION);
        }
        text = GEIST_SANS_USAGE.replace_all(&text, "geistSans.").into_owned();
    }
    if has_mono {
        names.push("Geist_Mono");
        if !text.contains("const geistMono") {
            declarations.push(MONO_DECLARATION);
        }
        text = GEIST_MONO_USAGE.replace_all(&text, "geistMono.").into_owned();
    }

    // Extend an existing loader import instead of adding a second one.
    let extended = GOOGLE_FONT_IMPORT.captures(&text).and_then(|caps| {
        let whole = caps.get(0)?;
        let mut merged: Vec<&str> = caps[2]
            .split(',')
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .collect();
        for name in &names {
            if !merged.contains(name) {
                merged.push(name);
            }
        }
        Some((whole.range(), format!("{} {} {}", &caps[1], merged.join(", "), &caps[3])))
    });
    let mut block = match extended {
        Some((range, line)) => {
            text.replace_range(range, &line);
            String::new()
        }
        None => format!("import {{ {} }} from 'next/font/google'", names.join(", ")),
    };
    if !declarations.is_empty() {
        if !block.is_empty() {
            block.push_str("\n\n");
        }
        block.push_str(&declarations.join("\n"));
    }

    // Place the block after the last remaining import, or at the top.
    if !block.is_empty() {
        match IMPORT_STATEMENT.find_iter(&text).last() {
            Some(last) => {
                let at = last.end();
                text.insert_str(at, &format!("\n{}\n", block));
            }
            None => {
                text.insert_str(0, &format!("{}\n\n", block));
            }
        }
    }

    tracing::debug!(sans = has_sans, mono = has_mono, "Normalized layout font imports");
    text
}
