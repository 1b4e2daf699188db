//! Point d'entrée CLI : boucle interactive ou export unique via options.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::Local;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

use biblio_inpn::{
    export_especes_n2000, export_especes_znieff, export_habitats_n2000,
    export_habitats_znieff, parse_n2000_codes, parse_znieff_codes, write_excel_output,
    ExportError, InpnPaths,
};

/// Générer une bibliographie biodiversité (ZNIEFF / Natura 2000) au format Excel
#[derive(Parser)]
#[command(name = "biblio_inpn")]
#[command(version)]
#[command(about = "Export bibliographique biodiversité depuis les référentiels INPN locaux")]
struct Cli {
    /// Augmenter la verbosité (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Mode silencieux
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Répertoire des référentiels INPN (parquet)
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Codes ZNIEFF séparés par ; ou , (mode non interactif)
    #[arg(long)]
    znieff: Option<String>,

    /// Codes Natura 2000 séparés par ; ou , (mode non interactif)
    #[arg(long)]
    n2000: Option<String>,

    /// Nom du projet (mode non interactif)
    #[arg(long)]
    project: Option<String>,

    /// Dossier de sortie de l'Excel (mode non interactif, défaut: .)
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let paths = InpnPaths::default_layout(&cli.data_dir);

    if cli.znieff.is_some() || cli.n2000.is_some() {
        // Mode non interactif: un seul export, erreurs fatales
        let codes_znieff = parse_znieff_codes(cli.znieff.as_deref().unwrap_or(""))?;
        let codes_n2000 = parse_n2000_codes(cli.n2000.as_deref().unwrap_or(""))?;
        if codes_znieff.is_empty() && codes_n2000.is_empty() {
            anyhow::bail!("Aucun code ZNIEFF ou N2000 fourni.");
        }
        let project = sanitize_project_name(cli.project.as_deref().unwrap_or(""));
        let output_dir = cli.output.unwrap_or_else(|| PathBuf::from("."));
        run_single_export(&paths, &codes_znieff, &codes_n2000, &project, &output_dir)?;
        return Ok(());
    }

    // Mode interactif: enchaîner les bibliographies
    let mut is_first_run = true;
    loop {
        if !is_first_run {
            println!("\n----- Nouvelle bibliographie -----\n");
        }
        let (codes_znieff, codes_n2000) = ask_codes()?;
        let project = sanitize_project_name(&prompt("Nom du projet :")?);
        let output_dir = ask_output_directory()?;

        if let Err(error) =
            run_single_export(&paths, &codes_znieff, &codes_n2000, &project, &output_dir)
        {
            match error.downcast_ref::<ExportError>() {
                Some(ExportError::EmptyResultSet) => println!("\n❌ {error}"),
                _ => println!("\n❌ Erreur lors de la génération : {error:#}"),
            }
        }

        if !ask_continue()? {
            println!("Fin du programme.");
            return Ok(());
        }
        is_first_run = false;
    }
}

/// Exécute un flux complet de lecture, filtrage et export Excel.
fn run_single_export(
    paths: &InpnPaths,
    codes_znieff: &[String],
    codes_n2000: &[String],
    project: &str,
    output_dir: &Path,
) -> Result<()> {
    println!("Lecture / filtrage habitats ZNIEFF...");
    let habitats_znieff = export_habitats_znieff(paths, codes_znieff)?;

    println!("Lecture / filtrage espèces ZNIEFF...");
    let especes_znieff = export_especes_znieff(paths, codes_znieff)?;

    println!("Lecture / filtrage habitats Natura 2000...");
    let habitats_n2000 = export_habitats_n2000(paths, codes_n2000)?;

    println!("Lecture / filtrage espèces Natura 2000...");
    let especes_n2000 = export_especes_n2000(paths, codes_n2000)?;

    let stamp = Local::now().format("%d%m%Y");
    let out_xlsx = output_dir.join(format!("Bibliographie_{}_{}.xlsx", project, stamp));

    let written = write_excel_output(
        &out_xlsx,
        &habitats_znieff,
        &especes_znieff,
        &habitats_n2000,
        &especes_n2000,
    )?;
    info!(path = %written.display(), "Export written");

    println!("\n✅ Excel généré : {}", written.display());
    println!("   - HABITATS ZNIEFF : {} lignes", habitats_znieff.height());
    println!("   - ESPECES ZNIEFF : {} lignes", especes_znieff.height());
    println!("   - HABITATS N2000 : {} lignes", habitats_n2000.height());
    println!("   - ESPECES N2000 : {} lignes", especes_n2000.height());
    Ok(())
}

/// Demande et valide les codes jusqu'à obtenir au moins un code.
fn ask_codes() -> Result<(Vec<String>, Vec<String>)> {
    loop {
        let codes_znieff = loop {
            let raw = prompt("Codes ZNIEFF séparés par ; ou , :")?;
            match parse_znieff_codes(&raw) {
                Ok(codes) => break codes,
                Err(error) => println!("Erreur: {error}"),
            }
        };

        let codes_n2000 = loop {
            let raw = prompt("Codes Natura 2000 séparés par ; ou , :")?;
            match parse_n2000_codes(&raw) {
                Ok(codes) => break codes,
                Err(error) => println!("Erreur: {error}"),
            }
        };

        if !codes_znieff.is_empty() || !codes_n2000.is_empty() {
            return Ok((codes_znieff, codes_n2000));
        }
        println!("Aucun code ZNIEFF ou N2000 fourni. Merci de saisir au moins un code.");
    }
}

/// Demande un dossier de sortie valide (obligatoire) et le crée si nécessaire.
fn ask_output_directory() -> Result<PathBuf> {
    loop {
        let raw = prompt("Chemin où créer l'Excel final :")?;
        let raw = raw.trim_matches('"').trim();
        if raw.is_empty() {
            println!("Le chemin est obligatoire.");
            continue;
        }

        let candidate = PathBuf::from(raw);
        if candidate.exists() && !candidate.is_dir() {
            println!(
                "Chemin invalide: {} existe mais ce n'est pas un dossier.",
                candidate.display()
            );
            continue;
        }
        match std::fs::create_dir_all(&candidate) {
            Ok(()) => return Ok(candidate),
            Err(error) => println!("Chemin invalide: {error}"),
        }
    }
}

/// Demande si l'utilisateur souhaite générer une autre bibliographie.
fn ask_continue() -> Result<bool> {
    loop {
        let answer =
            prompt("\nContinuer avec une autre bibliographie ? \nAppuyez sur O pour Oui ou N pour Non :")?;
        match answer.trim().to_uppercase().as_str() {
            "O" => return Ok(true),
            "N" => return Ok(false),
            _ => println!("Réponse invalide. Appuyez sur O pour Oui ou N pour Non."),
        }
    }
}

fn prompt(message: &str) -> Result<String> {
    println!("{message}");
    io::stdout().flush()?;
    read_prompt_line(&mut io::stdin().lock())
}

/// Lit une ligne de saisie. Une lecture de 0 octet (entrée standard fermée)
/// est une erreur : les boucles de saisie n'ont aucun appel bloquant et
/// tourneraient sans fin.
fn read_prompt_line(reader: &mut impl BufRead) -> Result<String> {
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        anyhow::bail!("Entrée interrompue (fin de l'entrée standard).");
    }
    Ok(line.trim().to_string())
}

/// Normalise un nom de projet pour un nom de fichier Windows: les caractères
/// interdits sont remplacés par un unique `_`.
fn sanitize_project_name(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return "SansNom".to_string();
    }

    let forbidden = ['\\', '/', ':', '*', '?', '"', '<', '>', '|'];
    let mut out = String::with_capacity(raw.len());
    let mut last_was_replacement = false;
    for c in raw.chars() {
        if forbidden.contains(&c) {
            if !last_was_replacement {
                out.push('_');
                last_was_replacement = true;
            }
        } else {
            out.push(c);
            last_was_replacement = false;
        }
    }
    out
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => Level::WARN,
        (_, 0) => Level::INFO,
        (_, 1) => Level::DEBUG,
        (_, _) => Level::TRACE,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}
