//! Project scaffold that makes an exported Next.js tree buildable on its own.

use std::collections::BTreeMap;

use serde_json::{Map, Value as JsonValue, json};

/// Runtime dependencies every exported project gets.
const BASE_DEPENDENCIES: &[(&str, &str)] = &[
    ("next", "15.1.0"),
    ("react", "^19.0.0"),
    ("react-dom", "^19.0.0"),
    ("@radix-ui/react-slot", "^1.1.0"),
    ("class-variance-authority", "^0.7.1"),
    ("clsx", "^2.1.1"),
    ("lucide-react", "^0.468.0"),
    ("tailwind-merge", "^2.5.5"),
    ("tailwindcss-animate", "^1.0.7"),
];

const DEV_DEPENDENCIES: &[(&str, &str)] = &[
    ("@types/node", "^22"),
    ("@types/react", "^19"),
    ("@types/react-dom", "^19"),
    ("autoprefixer", "^10.4.20"),
    ("postcss", "^8.4.49"),
    ("tailwindcss", "^3.4.17"),
    ("typescript", "^5"),
];

const TSCONFIG: &str = r#"{
  "compilerOptions": {
    "target": "ES2017",
    "lib": ["dom", "dom.iterable", "esnext"],
    "allowJs": true,
    "skipLibCheck": true,
    "strict": true,
    "noEmit": true,
    "esModuleInterop": true,
    "module": "esnext",
    "moduleResolution": "bundler",
    "resolveJsonModule": true,
    "isolatedModules": true,
    "jsx": "preserve",
    "incremental": true,
    "plugins": [{ "name": "next" }],
    "paths": { "@/*": ["./*"] }
  },
  "include": ["next-env.d.ts", "**/*.ts", "**/*.tsx", ".next/types/**/*.ts"],
  "exclude": ["node_modules"]
}
"#;

const NEXT_CONFIG: &str = r#"/** @type {import('next').NextConfig} */
const nextConfig = {
  eslint: { ignoreDuringBuilds: true },
  typescript: { ignoreBuildErrors: true },
  images: { unoptimized: true },
}

export default nextConfig
"#;

const POSTCSS_CONFIG: &str = r#"/** @type {import('postcss-load-config').Config} */
const config = {
  plugins: {
    tailwindcss: {},
    autoprefixer: {},
  },
}

export default config
"#;

const TAILWIND_CONFIG: &str = r#"import type { Config } from 'tailwindcss'

const config: Config = {
  darkMode: ['class'],
  content: ['./app/**/*.{ts,tsx}', './components/**/*.{ts,tsx}', './lib/**/*.{ts,tsx}'],
  theme: {
    extend: {
      colors: {
        border: 'hsl(var(--border))',
        input: 'hsl(var(--input))',
        ring: 'hsl(var(--ring))',
        background: 'hsl(var(--background))',
        foreground: 'hsl(var(--foreground))',
        primary: { DEFAULT: 'hsl(var(--primary))', foreground: 'hsl(var(--primary-foreground))' },
        secondary: { DEFAULT: 'hsl(var(--secondary))', foreground: 'hsl(var(--secondary-foreground))' },
        destructive: { DEFAULT: 'hsl(var(--destructive))', foreground: 'hsl(var(--destructive-foreground))' },
        muted: { DEFAULT: 'hsl(var(--muted))', foreground: 'hsl(var(--muted-foreground))' },
        accent: { DEFAULT: 'hsl(var(--accent))', foreground: 'hsl(var(--accent-foreground))' },
        popover: { DEFAULT: 'hsl(var(--popover))', foreground: 'hsl(var(--popover-foreground))' },
        card: { DEFAULT: 'hsl(var(--card))', foreground: 'hsl(var(--card-foreground))' },
      },
      borderRadius: {
        lg: 'var(--radius)',
        md: 'calc(var(--radius) - 2px)',
        sm: 'calc(var(--radius) - 4px)',
      },
      fontFamily: {
        sans: ['var(--font-geist-sans)'],
        mono: ['var(--font-geist-mono)'],
      },
    },
  },
  plugins: [require('tailwindcss-animate')],
}

export default config
"#;

const GLOBALS_CSS: &str = r#"@tailwind base;
@tailwind components;
@tailwind utilities;

@layer base {
  :root {
    --background: 0 0% 100%;
    --foreground: 0 0% 3.9%;
    --card: 0 0% 100%;
    --card-foreground: 0 0% 3.9%;
    --popover: 0 0% 100%;
    --popover-foreground: 0 0% 3.9%;
    --primary: 0 0% 9%;
    --primary-foreground: 0 0% 98%;
    --secondary: 0 0% 96.1%;
    --secondary-foreground: 0 0% 9%;
    --muted: 0 0% 96.1%;
    --muted-foreground: 0 0% 45.1%;
    --accent: 0 0% 96.1%;
    --accent-foreground: 0 0% 9%;
    --destructive: 0 84.2% 60.2%;
    --destructive-foreground: 0 0% 98%;
    --border: 0 0% 89.8%;
    --input: 0 0% 89.8%;
    --ring: 0 0% 3.9%;
    --radius: 0.5rem;
  }
}

@layer base {
  * {
    @apply border-border;
  }
  body {
    @apply bg-background text-foreground;
  }
}
"#;

const UTILS_TS: &str = r#"import { clsx, type ClassValue } from 'clsx'
import { twMerge } from 'tailwind-merge'

export function cn(...inputs: ClassValue[]) {
  return twMerge(clsx(inputs))
}
"#;

const COMPONENTS_JSON: &str = r#"{
  "$schema": "https://ui.shadcn.com/schema.json",
  "style": "default",
  "rsc": true,
  "tsx": true,
  "tailwind": {
    "config": "tailwind.config.ts",
    "css": "app/globals.css",
    "baseColor": "neutral",
    "cssVariables": true
  },
  "aliases": {
    "components": "@/components",
    "utils": "@/lib/utils",
    "ui": "@/components/ui"
  }
}
"#;

const NEXT_ENV: &str = r#"/// <reference types="next" />
/// <reference types="next/image-types/global" />

// NOTE: This file should not be edited
"#;

const GITIGNORE: &str = r#"node_modules
.next
out
build
.env*.local
.vercel
*.tsbuildinfo
"#;

/// Build `package.json` for the exported project.
///
/// `extra_dependencies` are npm package names reported by registry components;
/// they are added at `latest` unless already pinned.
pub fn package_json(name: &str, extra_dependencies: &[String]) -> String {
    let mut deps: Map<String, JsonValue> = BASE_DEPENDENCIES
        .iter()
        .map(|(k, v)| (k.to_string(), json!(v)))
        .collect();
    for dep in extra_dependencies {
        deps.entry(dep.clone()).or_insert_with(|| json!("latest"));
    }

    let dev_deps: Map<String, JsonValue> = DEV_DEPENDENCIES
        .iter()
        .map(|(k, v)| (k.to_string(), json!(v)))
        .collect();

    let manifest = json!({
        "name": name,
        "version": "0.1.0",
        "private": true,
        "scripts": {
            "dev": "next dev",
            "build": "next build",
            "start": "next start",
            "lint": "next lint"
        },
        "dependencies": deps,
        "devDependencies": dev_deps,
    });

    let mut text = serde_json::to_string_pretty(&manifest).unwrap_or_else(|_| "{}".to_string());
    text.push('\n');
    text
}

/// Declare missing runtime dependencies in a generator-supplied `package.json`.
///
/// Versions already present are kept. Returns `None` when the manifest is not
/// a JSON object or already declares everything.
pub fn merge_package_json(existing: &str, extra_dependencies: &[String]) -> Option<String> {
    let mut manifest: JsonValue = match serde_json::from_str(existing) {
        Ok(value @ JsonValue::Object(_)) => value,
        Ok(_) | Err(_) => {
            tracing::warn!("Generated package.json is not a JSON object, leaving it as is");
            return None;
        }
    };

    let deps = manifest
        .as_object_mut()?
        .entry("dependencies")
        .or_insert_with(|| JsonValue::Object(Map::new()))
        .as_object_mut()?;

    let wanted = BASE_DEPENDENCIES
        .iter()
        .map(|(k, v)| (k.to_string(), json!(v)))
        .chain(extra_dependencies.iter().map(|d| (d.clone(), json!("latest"))));

    let mut added = Vec::new();
    for (name, version) in wanted {
        if !deps.contains_key(&name) {
            deps.insert(name.clone(), version);
            added.push(name);
        }
    }
    if added.is_empty() {
        return None;
    }
    tracing::info!(dependencies = ?added, "Declared missing dependencies in package.json");

    let mut text = serde_json::to_string_pretty(&manifest).ok()?;
    text.push('\n');
    Some(text)
}

/// Every scaffold file keyed by path.
pub fn scaffold_files(name: &str, extra_dependencies: &[String]) -> BTreeMap<String, String> {
    let statics: [(&str, &str); 9] = [
        ("tsconfig.json", TSCONFIG),
        ("next.config.mjs", NEXT_CONFIG),
        ("postcss.config.mjs", POSTCSS_CONFIG),
        ("tailwind.config.ts", TAILWIND_CONFIG),
        ("app/globals.css", GLOBALS_CSS),
        ("lib/utils.ts", UTILS_TS),
        ("components.json", COMPONENTS_JSON),
        ("next-env.d.ts", NEXT_ENV),
        (".gitignore", GITIGNORE),
    ];

    let mut files: BTreeMap<String, String> = statics
        .into_iter()
        .map(|(path, content)| (path.to_string(), content.to_string()))
        .collect();
    files.insert(
        "package.json".to_string(),
        package_json(name, extra_dependencies),
    );
    files
}
