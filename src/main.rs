//! Courtside CLI
//!
//! Imports NBA game logs, builds point-in-time features, trains the
//! classifier and score models, and serves predictions.

use clap::{Parser, Subcommand};
use courtside::{Config, Result};

#[derive(Parser)]
#[command(name = "courtside")]
#[command(about = "NBA game prediction from point-in-time team features", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new project with default config
    Init,
    /// Game log management commands
    Data {
        #[command(subcommand)]
        action: DataCommands,
    },
    /// Feature table commands
    Features {
        #[command(subcommand)]
        action: FeatureCommands,
    },
    /// Train the classifier and score models on the stored game log
    Train {
        /// Override number of epochs
        #[arg(long)]
        epochs: Option<usize>,
        /// Override learning rate
        #[arg(long)]
        lr: Option<f64>,
    },
    /// Predict a single game
    Predict {
        /// Home team name
        home: String,
        /// Away team name
        away: String,
        /// Game date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<String>,
        /// Do not record the prediction in the prediction log
        #[arg(long)]
        no_log: bool,
        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },
    /// Predict every game in a JSON listing file
    PredictGames {
        /// JSON array of listings ({"id", "title", "teams": [{"name"}]})
        fixture: String,
        /// Game date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<String>,
        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },
    /// Model management commands
    Model {
        #[command(subcommand)]
        action: ModelCommands,
    },
    /// Prediction log commands
    Log {
        #[command(subcommand)]
        action: LogCommands,
    },
}

#[derive(Subcommand)]
enum DataCommands {
    /// Import a game log CSV into the database
    Import {
        /// Path to the CSV file
        path: String,
    },
    /// Register an extra name for a team
    Alias {
        /// The new name
        alias: String,
        /// A name the team already resolves from
        team: String,
    },
    /// Show database status
    Status,
}

#[derive(Subcommand)]
enum FeatureCommands {
    /// Build the training feature table from the stored game log
    Build {
        /// Output CSV path
        #[arg(long, default_value = "data/nba_features.csv")]
        out: String,
    },
}

#[derive(Subcommand)]
enum ModelCommands {
    /// Show model information
    Info,
}

#[derive(Subcommand)]
enum LogCommands {
    /// Record the real winner of a logged prediction
    Result {
        /// Prediction log id
        id: i64,
        /// Winning team name as it was predicted
        winner: String,
    },
    /// Show hit rate over resolved predictions
    Accuracy,
    /// Show recent predictions
    List {
        #[arg(long, default_value = "20")]
        limit: usize,
    },
}

#[derive(Clone, Debug)]
enum OutputFormat {
    Table,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {}. Use table or json.", s)),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load or create config
    let config = if std::path::Path::new(&cli.config).exists() {
        match Config::load(&cli.config) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        Config::default()
    };

    let result = match cli.command {
        Commands::Init => commands::init(&cli.config),
        Commands::Data { action } => match action {
            DataCommands::Import { path } => commands::data_import(&config, &path),
            DataCommands::Alias { alias, team } => commands::data_alias(&config, &alias, &team),
            DataCommands::Status => commands::data_status(&config),
        },
        Commands::Features { action } => match action {
            FeatureCommands::Build { out } => commands::features_build(&config, &out),
        },
        Commands::Train { epochs, lr } => commands::train(&config, epochs, lr),
        Commands::Predict {
            home,
            away,
            date,
            no_log,
            format,
        } => commands::predict(&config, &home, &away, date.as_deref(), !no_log, format),
        Commands::PredictGames {
            fixture,
            date,
            format,
        } => commands::predict_games(&config, &fixture, date.as_deref(), format),
        Commands::Model { action } => match action {
            ModelCommands::Info => commands::model_info(&config),
        },
        Commands::Log { action } => match action {
            LogCommands::Result { id, winner } => commands::log_result(&config, id, &winner),
            LogCommands::Accuracy => commands::log_accuracy(&config),
            LogCommands::List { limit } => commands::log_list(&config, limit),
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

mod commands {
    use super::*;
    use chrono::NaiveDate;
    use courtside::data::game_log::{parse_game_date, write_training_table_path};
    use courtside::data::{Database, GameLogReader, TeamGameHistory};
    use courtside::features::BatchFeatureBuilder;
    use courtside::predict::{
        GameListing, ModelRegistry, ModelStatus, PredictionEngine, RetrainStatus, TeamDirectory,
    };
    use courtside::{CourtsideError, PredictionResult};
    use std::sync::Arc;

    pub fn init(config_path: &str) -> Result<()> {
        let config = Config::default();
        config.save(config_path)?;
        println!("Created default config at {}", config_path);

        std::fs::create_dir_all("data")?;
        std::fs::create_dir_all("model")?;
        println!("Created data/ and model/ directories");

        println!("\nNext steps:");
        println!("  1. Edit {} to customize settings", config_path);
        println!("  2. Run 'courtside data import <game_logs.csv>' to load game logs");
        println!("  3. Run 'courtside train' to train the models");
        println!("  4. Run 'courtside predict \"Celtics\" \"Knicks\"' to make predictions");

        Ok(())
    }

    pub fn data_import(config: &Config, path: &str) -> Result<()> {
        let records = GameLogReader::read_path(path)?;
        println!("Read {} log rows from {}", records.len(), path);

        // Reject malformed files before touching the database
        let incoming = TeamGameHistory::from_records(records)?;
        let stats = incoming.stats();
        for (season, rows) in &stats.rows_per_season {
            println!("  {}: {} rows", season, rows);
        }

        let mut db = Database::open(&config.data.database_path)?;
        let count = db.upsert_game_logs(incoming.records())?;
        println!("Stored {} log rows in database", count);

        let history = db.load_history()?;
        println!(
            "Database now holds {} rows ({} matchups)",
            history.len(),
            history.matchups().len()
        );
        Ok(())
    }

    pub fn data_alias(config: &Config, alias: &str, team: &str) -> Result<()> {
        let db = Database::open(&config.data.database_path)?;
        let teams = directory(&db)?;
        let team_id = teams
            .resolve(team)
            .ok_or_else(|| CourtsideError::UnknownTeam(team.to_string()))?;
        db.add_team_alias(alias, team_id)?;
        println!(
            "'{}' now resolves to {}",
            alias,
            teams.full_name(team_id).unwrap_or(team)
        );
        Ok(())
    }

    pub fn data_status(config: &Config) -> Result<()> {
        let db = Database::open(&config.data.database_path)?;
        let stats = db.get_stats()?;

        println!("Database Status");
        println!("───────────────────────────────");
        println!("  Path:        {}", config.data.database_path);
        println!("  Log rows:    {}", stats.game_log_rows);
        println!("  Games:       {}", stats.games);
        println!("  Teams:       {}", stats.teams);
        println!("  Predictions: {}", stats.predictions);
        if let (Some(earliest), Some(latest)) = (stats.earliest_game, stats.latest_game) {
            println!("  Range:       {} to {}", earliest, latest);
        }
        for (season, rows) in &stats.rows_per_season {
            println!("  {}:     {} rows", season, rows);
        }

        Ok(())
    }

    pub fn features_build(config: &Config, out: &str) -> Result<()> {
        let db = Database::open(&config.data.database_path)?;
        let history = db.load_history()?;
        if history.is_empty() {
            println!("No game logs in database. Run 'courtside data import' first.");
            return Ok(());
        }

        let rows = BatchFeatureBuilder::build(&history);
        write_training_table_path(&rows, out)?;
        println!("Wrote {} feature rows to {}", rows.len(), out);
        Ok(())
    }

    pub fn train(config: &Config, epochs: Option<usize>, lr: Option<f64>) -> Result<()> {
        let db = Database::open(&config.data.database_path)?;
        let history = db.load_history()?;

        let mut training = config.training.clone();
        if let Some(epochs) = epochs {
            training.epochs = epochs;
        }
        if let Some(lr) = lr {
            training.learning_rate = lr;
        }

        println!("Training on {} log rows", history.len());
        println!(
            "  Epochs: {}, learning rate: {}, test fraction: {}",
            training.epochs, training.learning_rate, training.test_fraction
        );

        let registry = ModelRegistry::from_config(&config.data);
        match registry.retrain(&history, &training) {
            RetrainStatus::Success { classifier, scores } => {
                println!("\nClassifier: {}", classifier);
                match scores {
                    Some(scores) => println!("Scores:     {}", scores),
                    None => println!("Scores:     skipped (log carries no points)"),
                }
                println!("\nSaved classifier to {}", config.data.classifier_path);
                Ok(())
            }
            RetrainStatus::Error { error } => Err(CourtsideError::Training(error)),
        }
    }

    pub fn predict(
        config: &Config,
        home: &str,
        away: &str,
        date: Option<&str>,
        record: bool,
        format: OutputFormat,
    ) -> Result<()> {
        let db = Database::open(&config.data.database_path)?;
        let engine = engine(config, &db)?;
        let date = game_date(date)?;

        let prediction = engine
            .predict_on(home, away, date)
            .ok_or_else(|| CourtsideError::UnknownTeam(format!("{} vs {}", home, away)))?;

        let log_id = if record && !prediction.is_placeholder {
            Some(db.log_prediction(&prediction)?)
        } else {
            None
        };

        match format {
            OutputFormat::Table => {
                print!("{}", format_prediction(&prediction));
                if let Some(id) = log_id {
                    println!("  Logged as #{}", id);
                }
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&prediction)?);
            }
        }
        Ok(())
    }

    pub fn predict_games(
        config: &Config,
        fixture: &str,
        date: Option<&str>,
        format: OutputFormat,
    ) -> Result<()> {
        let content = std::fs::read_to_string(fixture)?;
        let listings: Vec<GameListing> = serde_json::from_str(&content)?;

        let db = Database::open(&config.data.database_path)?;
        let engine = engine(config, &db)?;
        let results = engine.predict_games_on(&listings, game_date(date)?);
        let predictions: Vec<PredictionResult> = results.into_iter().flatten().collect();
        log::info!(
            "Predicted {} of {} listings",
            predictions.len(),
            listings.len()
        );

        match format {
            OutputFormat::Table => {
                for prediction in &predictions {
                    print!("{}", format_prediction(prediction));
                    println!();
                }
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&predictions)?);
            }
        }
        Ok(())
    }

    pub fn model_info(config: &Config) -> Result<()> {
        let registry = ModelRegistry::from_config(&config.data);
        if registry.load() != ModelStatus::Loaded {
            return Err(CourtsideError::NoModel);
        }
        let info = registry.info();

        println!("Model Information");
        println!("───────────────────────────────");
        println!("  Classifier:  {}", config.data.classifier_path);
        println!("  Type:        {}", info.model_type.unwrap_or_default());
        println!("  Trained at:  {}", info.trained_at.unwrap_or_default());
        println!("  Features:    {}", info.classifier_features.join(", "));
        if let Some(metrics) = info.classifier_metrics {
            println!("  Metrics:     {}", metrics);
        }
        match info.score_metrics {
            Some(metrics) => {
                println!("  Score model: {}", config.data.score_model_path);
                println!("  Features:    {}", info.score_features.len());
                println!("  Metrics:     {}", metrics);
            }
            None => println!("  Score model: not available"),
        }
        Ok(())
    }

    pub fn log_result(config: &Config, id: i64, winner: &str) -> Result<()> {
        let db = Database::open(&config.data.database_path)?;
        if db.record_result(id, winner)? {
            println!("Recorded {} as winner of prediction #{}", winner, id);
        } else {
            println!("No prediction with id {}", id);
        }
        Ok(())
    }

    pub fn log_accuracy(config: &Config) -> Result<()> {
        let db = Database::open(&config.data.database_path)?;
        let summary = db.prediction_accuracy()?;

        println!("Prediction Accuracy");
        println!("───────────────────────────────");
        println!("  Logged:   {}", summary.logged);
        println!("  Resolved: {}", summary.resolved);
        println!("  Correct:  {}", summary.correct);
        match summary.accuracy {
            Some(acc) => println!("  Accuracy: {:.1}%", acc * 100.0),
            None => println!("  Accuracy: n/a"),
        }
        Ok(())
    }

    pub fn log_list(config: &Config, limit: usize) -> Result<()> {
        let db = Database::open(&config.data.database_path)?;
        for entry in db.get_predictions(limit)? {
            let outcome = match entry.was_correct {
                Some(true) => "correct",
                Some(false) => "wrong",
                None => "pending",
            };
            println!(
                "#{:<5} {}  {} vs {}  -> {} ({:.1}%)  [{}]",
                entry.id,
                entry.created_at,
                entry.home_team,
                entry.away_team,
                entry.predicted_winner,
                entry.home_win_prob * 100.0,
                outcome
            );
        }
        Ok(())
    }

    fn directory(db: &Database) -> Result<TeamDirectory> {
        Ok(TeamDirectory::nba().with_aliases(db.get_team_aliases()?))
    }

    fn engine(config: &Config, db: &Database) -> Result<PredictionEngine> {
        let registry = Arc::new(ModelRegistry::from_config(&config.data));
        if registry.load() != ModelStatus::Loaded {
            log::warn!("No trained model found, predictions will be placeholders");
        }
        Ok(PredictionEngine::new(
            registry,
            directory(db)?,
            db.load_history()?,
            config.features.current_season.clone(),
        ))
    }

    fn game_date(raw: Option<&str>) -> Result<NaiveDate> {
        match raw {
            Some(raw) => parse_game_date(raw),
            None => Ok(chrono::Local::now().date_naive()),
        }
    }

    fn format_prediction(p: &PredictionResult) -> String {
        let mut out = String::new();
        out.push_str(&format!("{} (home) vs {} (away)\n", p.home_team, p.away_team));
        out.push_str("───────────────────────────────\n");
        if let Some(id) = &p.game_id {
            out.push_str(&format!("  Listing:     {}\n", id));
        }
        out.push_str(&format!(
            "  Win prob:    {:.1}% / {:.1}%\n",
            p.home_win_prob * 100.0,
            p.away_win_prob * 100.0
        ));
        out.push_str(&format!("  Winner:      {}\n", p.predicted_winner));
        out.push_str(&format!("  Confidence:  {:.1}%\n", p.confidence * 100.0));
        if let (Some(home), Some(away)) = (p.predicted_home_score, p.predicted_away_score) {
            out.push_str(&format!("  Score:       {} - {}\n", home, away));
        }
        if let Some(margin) = p.predicted_margin {
            out.push_str(&format!("  Margin:      {:+.1}\n", margin));
        }
        out.push_str(&format!("  {}\n", p.recommendation));
        out
    }
}
