use anyhow::Context;
use clap::Parser;
use hf_titration::core::{ScriptedDecisions, ScriptedInformation};
use hf_titration::domain::model::MedicationClass;
use hf_titration::domain::ports::ConfigProvider;
use hf_titration::utils::error::{ErrorSeverity, TitrationError};
use hf_titration::utils::logger;
use hf_titration::utils::monitor::RunMonitor;
use hf_titration::{
    CliConfig, LocalStorage, PatientSimulator, ProtocolRepository, ScenarioSet, SimulationEngine,
    TitrationContextAggregator,
};

fn main() -> anyhow::Result<()> {
    let config = CliConfig::parse();

    // 初始化日誌
    if config.json_logs {
        logger::init_json_logger(config.verbose);
    } else {
        logger::init_cli_logger(config.verbose);
    }

    tracing::info!("🚀 Starting hf-titration CLI");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    if let Err(e) = run(&config) {
        tracing::error!("❌ Run failed: {:#}", e);

        // 根據錯誤嚴重程度決定退出碼
        let exit_code = match e.downcast_ref::<TitrationError>() {
            Some(err) => {
                tracing::error!(
                    "❌ Category: {:?}, Severity: {:?}",
                    err.category(),
                    err.severity()
                );
                eprintln!("❌ {}", err.user_friendly_message());
                eprintln!("💡 建議: {}", err.recovery_suggestion());
                match err.severity() {
                    ErrorSeverity::Low => 0,
                    ErrorSeverity::Medium => 2,
                    ErrorSeverity::High => 1,
                    ErrorSeverity::Critical => 3,
                }
            }
            None => {
                eprintln!("❌ {:#}", e);
                1
            }
        };

        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }

    Ok(())
}

fn run(cli: &CliConfig) -> anyhow::Result<()> {
    if cli.catalog {
        let repository = ProtocolRepository::load()?;
        print_catalog(&repository);
        return Ok(());
    }

    let scenarios = ScenarioSet::from_file(&cli.scenarios)
        .with_context(|| format!("loading scenarios from {}", cli.scenarios))?;

    if cli.list {
        print_scenarios(&scenarios);
        return Ok(());
    }

    let run_config = cli.resolve()?;
    let repository = ProtocolRepository::load()?;
    tracing::info!("📋 Loaded {} medication protocols", repository.len());

    let patient_id = match &cli.patient_id {
        Some(id) => id.clone(),
        None => scenarios
            .scenarios()
            .first()
            .map(|s| s.id.clone())
            .with_context(|| format!("no scenarios in {}", cli.scenarios))?,
    };
    let scenario = scenarios.find(&patient_id)?;
    let mut state = scenario.to_patient_state(run_config.total_weeks())?;
    run_config.patterns.apply(&mut state.profile);

    if cli.dry_run {
        let context = TitrationContextAggregator::new(&repository).collect(&state);
        println!("{}", context.to_json_pretty()?);
        return Ok(());
    }

    if cli.monitor {
        tracing::info!("🔍 System monitoring enabled");
    }

    let simulator = PatientSimulator::from_optional_seed(run_config.seed(), run_config.baseline.clone());
    let storage = LocalStorage::new(run_config.results_dir());
    let mut engine = SimulationEngine::new(&repository, simulator, storage)
        .with_monitor(RunMonitor::new(cli.monitor));

    if let Some(path) = &cli.decisions {
        let decisions = ScriptedDecisions::from_file(path)
            .with_context(|| format!("loading decisions from {}", path))?;
        tracing::info!("📋 {} scripted weekly decisions", decisions.len());
        engine = engine.with_decisions(decisions);
    }
    if let Some(path) = &cli.info_flags {
        let flags = ScriptedInformation::from_file(path)
            .with_context(|| format!("loading information flags from {}", path))?;
        engine = engine.with_classifier(flags);
    }

    let outcome = engine.run(state)?;
    let record = &outcome.record;

    println!("✅ Simulation complete for {} ({})", record.patient_name, record.patient_id);
    println!("📊 Clinical outcome: {}", record.clinical_outcome);
    println!("📊 Weeks completed: {}/{}", record.weeks_completed, record.parameters.weeks);
    println!(
        "📊 Mentions - missed doses: {}, emergencies: {}, dose increases: {}",
        record.evidence.missed_dose_mentions,
        record.evidence.emergency_mentions,
        record.evidence.increase_mentions
    );
    if let Some(reason) = &record.termination_reason {
        println!("⚠️ Terminated early: {}", reason);
    }
    println!(
        "📁 Saved to: {}",
        engine.storage().full_path(&outcome.output_path).display()
    );

    Ok(())
}

fn print_catalog(repository: &ProtocolRepository) {
    for class in MedicationClass::ALL {
        let summary = repository.medications_by_class_summary(*class);
        if summary.medications.is_empty() {
            continue;
        }

        println!("{}", class.as_str());
        for medication in &summary.medications {
            println!(
                "  {:<28} start {:<18} max {:<18} {}",
                medication.name,
                medication.starting_dose.to_string(),
                medication.maximum_dose.to_string(),
                if medication.requires_titration { "titrate" } else { "fixed" }
            );
        }
    }
}

fn print_scenarios(scenarios: &ScenarioSet) {
    if scenarios.is_empty() {
        println!("No scenarios found.");
        return;
    }

    println!(
        "{:<10} {:<24} {:<14} {:<10} {}",
        "ID", "Patient Name", "Education", "Literacy", "Medications"
    );
    for scenario in scenarios.scenarios() {
        println!(
            "{:<10} {:<24} {:<14} {:<10} {} medications",
            scenario.id,
            scenario.patient_name,
            scenario.education_level.as_str(),
            scenario.medical_literacy.as_str(),
            scenario.medications.len()
        );
    }
}
