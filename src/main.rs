use anyhow::Result;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use toefl_trainer::{
    ApiClient, Config, Credentials, DashboardService, Level, QuizConfig, QuizService, SessionStore,
    SignupForm, config::LoggingConfig,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    let _guard = setup_logging(&config.logging)?;
    config.log_summary();
    config.validate()?;

    let client = ApiClient::new(&config.api.base_url, config.api.timeout())?;
    let mut session = SessionStore::open(client.clone(), &config.session.storage_path);

    let user_id = resolve_user_id(&session, &config);
    let mut quiz = QuizService::new(client.clone(), user_id.clone());
    let mut dashboard = DashboardService::new(client.clone(), user_id);

    info!(base_url = %client.base_url(), "TOEFL trainer ready");

    println!("TOEFL vocabulary trainer — backend at {}", client.base_url());
    println!("Commands: signup, login, logout, whoami, quiz, dashboard, help, quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let command = prompt(&mut lines, "> ").await?;
        match command.as_str() {
            "" => {}
            "help" => {
                println!("signup     create an account and sign in");
                println!("login      sign in with email and password");
                println!("logout     clear the stored session");
                println!("whoami     show the current identity");
                println!("quiz       configure, play and submit a quiz");
                println!("dashboard  show progress stats and the lesson plan");
                println!("quit       exit");
            }
            "signup" => {
                if let Err(err) = run_signup(&mut lines, &mut session).await {
                    println!("signup failed: {err}");
                }
                let user_id = resolve_user_id(&session, &config);
                quiz = QuizService::new(client.clone(), user_id.clone());
                dashboard = DashboardService::new(client.clone(), user_id);
            }
            "login" => {
                if let Err(err) = run_login(&mut lines, &mut session).await {
                    println!("login failed: {err}");
                }
                let user_id = resolve_user_id(&session, &config);
                quiz = QuizService::new(client.clone(), user_id.clone());
                dashboard = DashboardService::new(client.clone(), user_id);
            }
            "logout" => match session.logout().await {
                Ok(()) => println!("logged out"),
                Err(err) => println!("logout failed: {err}"),
            },
            "whoami" => {
                if session.is_authenticated() {
                    let name = session.identity().display_name().unwrap_or("(unnamed)");
                    println!("signed in as {name}");
                } else {
                    println!("not signed in");
                }
            }
            "quiz" => {
                if let Err(err) = run_quiz(&mut lines, &mut quiz).await {
                    println!("quiz aborted: {err}");
                }
            }
            "dashboard" => {
                if let Err(err) = run_dashboard(&mut dashboard, &session).await {
                    println!("dashboard unavailable: {err}");
                }
            }
            "quit" | "exit" => break,
            other => println!("unknown command '{other}', try 'help'"),
        }
    }

    Ok(())
}

/// The backend keys quiz and dashboard calls by user id; until login
/// responses carry one, the configured fallback id fills in.
fn resolve_user_id(session: &SessionStore, config: &Config) -> String {
    session
        .identity()
        .user
        .as_ref()
        .and_then(|u| u.id.clone())
        .unwrap_or_else(|| config.session.fallback_user_id.clone())
}

async fn prompt(lines: &mut Lines<BufReader<Stdin>>, message: &str) -> Result<String> {
    print!("{message}");
    std::io::stdout().flush()?;
    Ok(lines
        .next_line()
        .await?
        .unwrap_or_default()
        .trim()
        .to_string())
}

async fn run_signup(lines: &mut Lines<BufReader<Stdin>>, session: &mut SessionStore) -> Result<()> {
    let full_name = prompt(lines, "full name: ").await?;
    let email = prompt(lines, "email: ").await?;
    let password = prompt(lines, "password: ").await?;
    let target = prompt(lines, "target score (blank to skip): ").await?;
    let target_score = if target.is_empty() {
        None
    } else {
        Some(target.parse::<u32>()?)
    };

    session
        .signup(&SignupForm {
            full_name,
            email,
            password,
            target_score,
        })
        .await?;
    println!("welcome aboard!");
    Ok(())
}

async fn run_login(lines: &mut Lines<BufReader<Stdin>>, session: &mut SessionStore) -> Result<()> {
    let email = prompt(lines, "email: ").await?;
    let password = prompt(lines, "password: ").await?;
    session.login(&Credentials { email, password }).await?;
    println!("signed in");
    Ok(())
}

async fn run_quiz(lines: &mut Lines<BufReader<Stdin>>, quiz: &mut QuizService) -> Result<()> {
    let level_raw = prompt(lines, "level [beginner/intermediate/advanced] (intermediate): ").await?;
    let level = if level_raw.is_empty() {
        Level::Intermediate
    } else {
        level_raw.parse()?
    };

    let count_raw = prompt(lines, "questions [5/10/15] (10): ").await?;
    let question_count = if count_raw.is_empty() {
        10
    } else {
        count_raw.parse::<u8>()?
    };

    let focus_raw = prompt(lines, "focus [Vocabulary/Reading/Listening/Speaking] (Vocabulary): ").await?;
    let focus = if focus_raw.is_empty() {
        toefl_trainer::Focus::Vocabulary
    } else {
        focus_raw.parse()?
    };

    println!("generating questions, hold on...");
    quiz.start_quiz(&QuizConfig {
        level,
        question_count,
        focus,
    })
    .await?;

    let questions: Vec<_> = quiz.questions().to_vec();
    for (number, question) in questions.iter().enumerate() {
        println!();
        println!("{}. {}", number + 1, question.prompt);
        for (i, choice) in question.options.iter().enumerate() {
            println!("   {}) {}", letter(i), choice.label);
        }
        let raw = prompt(lines, "your answer (letter, blank to skip): ").await?;
        if raw.is_empty() {
            continue;
        }
        let value = choice_value(&raw, question).unwrap_or(raw);
        quiz.record_answer(&question.id, &value);
    }

    println!();
    println!(
        "answered {} of {}",
        quiz.answered_count(),
        quiz.questions().len()
    );
    if !quiz.all_answered() {
        let proceed = prompt(lines, "some questions are unanswered, submit anyway? [y/N]: ").await?;
        if !proceed.eq_ignore_ascii_case("y") {
            println!("submission skipped, answers kept");
            return Ok(());
        }
    }

    let result = quiz.submit_quiz().await?;
    println!(
        "score: {:.1} ({} of {} correct)",
        result.score,
        result
            .correct_count
            .map(|c| c.to_string())
            .unwrap_or_else(|| "?".to_string()),
        result.total_questions
    );
    if let Some(feedback) = &result.feedback {
        println!("feedback: {feedback}");
    }
    for (i, graded) in result.results.iter().enumerate() {
        let number = graded.question_number.unwrap_or((i + 1) as u64);
        if graded.is_correct {
            println!("  {number}. correct ({})", graded.correct_answer);
        } else {
            println!(
                "  {number}. wrong: answered '{}', expected '{}'",
                graded.user_answer, graded.correct_answer
            );
        }
    }
    for recommendation in &result.recommendations {
        match &recommendation.skill {
            Some(skill) => println!("  - [{skill}] {}", recommendation.text),
            None => println!("  - {}", recommendation.text),
        }
    }
    Ok(())
}

async fn run_dashboard(dashboard: &mut DashboardService, session: &SessionStore) -> Result<()> {
    dashboard.refresh(session.token()).await?;

    let stats = dashboard.stats(session.identity());
    println!("current score : {}", stats.current_score);
    println!("target score  : {}", stats.target_score);
    println!("words mastered: {}", stats.words_mastered);
    println!("streak        : {}", stats.streak);
    if let Some(level) = &stats.current_level {
        println!("level         : {level} ({} quizzes taken)", stats.total_quizzes);
    }

    if !stats.recent_history.is_empty() {
        println!("recent quizzes:");
        for item in &stats.recent_history {
            println!("  {} {} {} {:.1}", item.date, item.level, item.session_id, item.score);
        }
    }

    if dashboard.lesson_plan().is_empty() {
        println!("lesson plan   : (empty)");
    } else {
        println!("lesson plan:");
        for lesson in dashboard.lesson_plan() {
            let next = lesson.next_action.as_deref().unwrap_or("-");
            println!("  [{}] {} ({}) next: {}", lesson.status, lesson.title, lesson.skill, next);
        }
    }
    Ok(())
}

fn letter(index: usize) -> char {
    (b'A' + (index % 26) as u8) as char
}

/// Map a typed letter back to the option's submit value; anything else is
/// treated as a literal answer value.
fn choice_value(raw: &str, question: &toefl_trainer::Question) -> Option<String> {
    let c = raw.trim().chars().next()?;
    if raw.trim().len() != 1 || !c.is_ascii_alphabetic() {
        return None;
    }
    let index = (c.to_ascii_uppercase() as u8 - b'A') as usize;
    question.options.get(index).map(|choice| choice.value.clone())
}

fn setup_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    use tracing_subscriber::fmt;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.level.clone()));

    let console_layer = config
        .console_enabled
        .then(|| fmt::layer().with_target(true).with_ansi(true));

    let (file_layer, guard) = if config.file_enabled {
        std::fs::create_dir_all(&config.log_directory).unwrap_or_else(|e| {
            eprintln!("Warning: Could not create logs directory: {}", e);
        });
        let file_appender = tracing_appender::rolling::daily(&config.log_directory, "toefl-trainer.log");
        let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);
        let layer = fmt::layer()
            .with_target(true)
            .with_ansi(false)
            .with_writer(non_blocking_file);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    Ok(guard)
}
