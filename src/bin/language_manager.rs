// Copyright (c) 2024-present, prinbee-storage contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Merges a built-in Unicode locale table into a Prinbee language file,
//! assigning previously unused 16-bit ids in random order, and writing the
//! result back atomically (§4.8, §6).

use clap::Parser;
use prinbee_storage::lang::{DuplicateMode, LanguageEntry, Registry};
use rand::seq::SliceRandom;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "language-manager", about = "Maintains the Prinbee 16-bit language id table")]
struct Args {
    /// List the languages as Prinbee currently sees them.
    #[arg(long)]
    list: bool,

    /// List the locales available from the built-in Unicode locale table.
    #[arg(long = "list-available")]
    list_available: bool,

    /// Merge the Unicode locale table into the Prinbee language file,
    /// assigning unused ids to anything new.
    #[arg(long)]
    create: bool,

    /// Path of the Prinbee language `.ini` file.
    #[arg(long)]
    file: PathBuf,

    /// Report duplicate locale keys encountered while merging.
    #[arg(long)]
    verbose: bool,
}

/// One row of the built-in Unicode locale table: language, country,
/// 2-letter language, 2-letter country, 3-letter language. Country fields
/// are empty for a language with no specific regional variant, per the
/// same convention `LanguageEntry::key` uses.
const LOCALES: &[(&str, &str, &str, &str, &str)] = &[
    ("English", "", "en", "", "eng"),
    ("English", "United States", "en", "US", "eng"),
    ("English", "United Kingdom", "en", "GB", "eng"),
    ("English", "Canada", "en", "CA", "eng"),
    ("French", "", "fr", "", "fre"),
    ("French", "France", "fr", "FR", "fre"),
    ("French", "Canada", "fr", "CA", "fre"),
    ("German", "", "de", "", "ger"),
    ("German", "Germany", "de", "DE", "ger"),
    ("Spanish", "", "es", "", "spa"),
    ("Spanish", "Spain", "es", "ES", "spa"),
    ("Spanish", "Mexico", "es", "MX", "spa"),
    ("Italian", "Italy", "it", "IT", "ita"),
    ("Portuguese", "Portugal", "pt", "PT", "por"),
    ("Portuguese", "Brazil", "pt", "BR", "por"),
    ("Dutch", "Netherlands", "nl", "NL", "dut"),
    ("Russian", "Russia", "ru", "RU", "rus"),
    ("Polish", "Poland", "pl", "PL", "pol"),
    ("Swedish", "Sweden", "sv", "SE", "swe"),
    ("Norwegian", "Norway", "no", "NO", "nor"),
    ("Danish", "Denmark", "da", "DK", "dan"),
    ("Finnish", "Finland", "fi", "FI", "fin"),
    ("Greek", "Greece", "el", "GR", "gre"),
    ("Turkish", "Turkiye", "tr", "TR", "tur"),
    ("Arabic", "", "ar", "", "ara"),
    ("Hebrew", "Israel", "he", "IL", "heb"),
    ("Hindi", "India", "hi", "IN", "hin"),
    ("Chinese", "China", "zh", "CN", "chi"),
    ("Chinese", "Taiwan", "zh", "TW", "chi"),
    ("Japanese", "Japan", "ja", "JP", "jpn"),
    ("Korean", "South Korea", "ko", "KR", "kor"),
    ("Vietnamese", "Vietnam", "vi", "VN", "vie"),
    ("Thai", "Thailand", "th", "TH", "tha"),
    ("Ukrainian", "Ukraine", "uk", "UA", "ukr"),
    ("Czech", "Czechia", "cs", "CZ", "cze"),
    ("Hungarian", "Hungary", "hu", "HU", "hun"),
    ("Romanian", "Romania", "ro", "RO", "rum"),
];

fn available_languages() -> Vec<LanguageEntry> {
    LOCALES
        .iter()
        .enumerate()
        .map(|(idx, &(language, country, language_2, country_2, language_3))| LanguageEntry {
            id: (idx + 1) as u16,
            country: country.to_string(),
            language: language.to_string(),
            country_2_letters: country_2.to_string(),
            language_2_letters: language_2.to_string(),
            language_3_letters: language_3.to_string(),
        })
        .collect()
}

fn print_entry(entry: &LanguageEntry) {
    println!(
        "{:>5}  {:<10}  {:<20} {:<20} (2L={:<2} 3L={:<3} C2={})",
        entry.id, entry.key(), entry.language, entry.country, entry.language_2_letters, entry.language_3_letters, entry.country_2_letters
    );
}

fn list(registry: &Registry) {
    for id in registry.ids() {
        if let Some(entry) = registry.get(id) {
            print_entry(entry);
        }
    }
}

fn list_available() {
    for entry in available_languages() {
        print_entry(&entry);
    }
}

/// Merges the built-in locale table into `registry`, handing out a random
/// previously-unused id to each locale whose key is not already present.
fn merge(registry: &mut Registry, verbose: bool) {
    let mut candidates: Vec<u16> = (1..=u16::MAX).collect();
    candidates.shuffle(&mut rand::rng());
    let mut next_candidate = 0usize;

    for locale in available_languages() {
        if registry.find_by_key(&locale.key()).is_some() {
            continue;
        }

        while next_candidate < candidates.len() && registry.get(candidates[next_candidate]).is_some() {
            next_candidate += 1;
        }
        let Some(&id) = candidates.get(next_candidate) else {
            eprintln!("language-manager: ran out of unused language ids");
            break;
        };
        next_candidate += 1;

        if verbose {
            println!("language-manager:info: adding '{}' as id {id}", locale.key());
        }
        let mut entry = locale;
        entry.id = id;
        if let Err(error) = registry.insert(entry) {
            eprintln!("language-manager: {error}");
        }
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    if args.list_available {
        if args.list {
            eprintln!("warning: --list is ignored when --list-available is used.");
        }
        list_available();
        return ExitCode::SUCCESS;
    }

    let duplicate_mode = if args.verbose { DuplicateMode::Verbose } else { DuplicateMode::Silent };
    let mut registry = if args.file.exists() {
        match Registry::load_with_mode(&args.file, duplicate_mode) {
            Ok(registry) => registry,
            Err(error) => {
                eprintln!("language-manager: could not load {}: {error}", args.file.display());
                return ExitCode::FAILURE;
            }
        }
    } else {
        Registry::new(duplicate_mode)
    };

    if args.list {
        list(&registry);
        return ExitCode::SUCCESS;
    }

    if args.create {
        merge(&mut registry, args.verbose);
        if let Err(error) = registry.save(&args.file) {
            eprintln!("language-manager: could not save {}: {error}", args.file.display());
            return ExitCode::FAILURE;
        }
    }

    ExitCode::SUCCESS
}
