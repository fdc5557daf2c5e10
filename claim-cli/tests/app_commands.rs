use claim_cli::app;
use claim_cli::cli::Cli;
use claim_cli::config::AppConfig;
use claim_core::db::MemoryRepository;
use claim_core::{ClaimKind, ClaimRepository, ClaimStatus};
use clap::Parser;
use pretty_assertions::assert_eq;
use rust_decimal_macros::dec;
use serde_json::Value;

fn fixture(name: &str) -> String {
    format!("{}/tests/fixtures/{name}", env!("CARGO_MANIFEST_DIR"))
}

async fn exec(
    repo: &MemoryRepository,
    args: &[&str],
) -> anyhow::Result<String> {
    let cli = Cli::try_parse_from(std::iter::once("progress-claims").chain(args.iter().copied()))?;
    app::run(repo, &AppConfig::default(), cli.command, cli.json).await
}

async fn exec_json(
    repo: &MemoryRepository,
    args: &[&str],
) -> Value {
    let mut args = args.to_vec();
    args.push("--json");
    let out = exec(repo, &args).await.unwrap();
    serde_json::from_str(&out).unwrap()
}

async fn add_project(repo: &MemoryRepository) -> String {
    let project = exec_json(
        repo,
        &["project", "add", "--name", "Warehouse", "--total-value", "1500000"],
    )
    .await;
    project["id"].to_string()
}

#[tokio::test]
async fn project_add_uses_default_rates() {
    let repo = MemoryRepository::new();

    let project = exec_json(
        &repo,
        &["project", "add", "--name", "Warehouse", "--total-value", "1,500,000"],
    )
    .await;

    assert_eq!(project["total_value"], "1500000.00");
    assert_eq!(project["gst_rate"], "10.00");
    assert_eq!(project["retention_rate"], "5.00");
}

#[tokio::test]
async fn project_update_changes_only_the_given_fields() {
    let repo = MemoryRepository::new();
    let project = add_project(&repo).await;

    let updated = exec_json(
        &repo,
        &[
            "project", "update", &project, "--gst-rate", "15", "--retention-rate", "2.5",
            "--status", "on_hold", "--retention-first-release", "50",
            "--retention-first-release-timing", "Practical completion", "--dlp-months", "12",
        ],
    )
    .await;

    assert_eq!(updated["name"], "Warehouse");
    assert_eq!(updated["total_value"], "1500000.00");
    assert_eq!(updated["gst_rate"], "15.00");
    assert_eq!(updated["retention_rate"], "2.50");
    assert_eq!(updated["status"], "on_hold");
    assert_eq!(updated["retention_schedule"]["first_release_percent"], "50.00");
    assert_eq!(updated["retention_schedule"]["first_release_timing"], "Practical completion");
    assert_eq!(updated["retention_schedule"]["dlp_months"], 12);

    let shown = exec(&repo, &["project", "show", &project]).await.unwrap();
    assert!(shown.contains("  First release:   50.00% Practical completion"));

    // Later claims use the new rates.
    let preview = exec_json(
        &repo,
        &["claim", "simple", "--project", &project, "--number", "PC-01", "--percent", "75"],
    )
    .await;
    assert_eq!(preview["gst"], "168750.00");
    assert_eq!(preview["retention_held"], "28125.00");
    assert_eq!(preview["amount_due"], "1265625.00");
}

#[tokio::test]
async fn rejected_project_update_stores_nothing() {
    let repo = MemoryRepository::new();
    let project = add_project(&repo).await;
    let id: i64 = project.parse().unwrap();

    for args in [
        ["--gst-rate", "2.125"],
        ["--total-value", "-1"],
        ["--retention-rate", "5000"],
        ["--status", "archived"],
        ["--retention-final-release", "150"],
    ] {
        let mut command = vec!["project", "update", &project];
        command.extend(args);
        assert!(exec(&repo, &command).await.is_err(), "{args:?}");
    }

    let stored = repo.get_project(id).await.unwrap();
    assert_eq!(stored.gst_rate, dec!(10.00));
    assert_eq!(stored.retention_rate, dec!(5.00));
    assert_eq!(stored.total_value, dec!(1500000.00));
    assert_eq!(stored.retention_schedule, Default::default());
}

#[tokio::test]
async fn updating_a_missing_project_fails() {
    let repo = MemoryRepository::new();

    let err = exec(&repo, &["project", "update", "99", "--name", "Ghost"])
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "project 99");
}

#[tokio::test]
async fn simple_preview_stores_nothing() {
    let repo = MemoryRepository::new();
    let project = add_project(&repo).await;

    let preview = exec_json(
        &repo,
        &["claim", "simple", "--project", &project, "--number", "PC-01", "--percent", "75"],
    )
    .await;

    assert_eq!(preview["this_claim"], "1125000.00");
    assert_eq!(preview["amount_due"], "1181250.00");
    assert!(repo.list_recent_claims(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn simple_submit_then_status_change() {
    let repo = MemoryRepository::new();
    let project = add_project(&repo).await;

    let submitted = exec_json(
        &repo,
        &[
            "claim", "simple", "--project", &project, "--number", "PC-02", "--percent", "75",
            "--previous", "750000", "--month-ending", "2026-09-30", "--submit",
        ],
    )
    .await;
    let claim_id = submitted["claim"]["id"].as_i64().unwrap();

    assert_eq!(submitted["claim"]["this_claim"], "375000.00");
    assert_eq!(submitted["claim"]["status"], "pending");

    let out = exec(&repo, &["claim", "status", &claim_id.to_string(), "Approved"])
        .await
        .unwrap();
    assert!(out.contains("Status:                approved"));

    let stored = repo.get_claim(claim_id).await.unwrap();
    assert_eq!(stored.status, ClaimStatus::Approved);
    assert_eq!(stored.amount_due, dec!(393750.00));
}

#[tokio::test]
async fn invalid_percent_is_reported_by_field() {
    let repo = MemoryRepository::new();
    let project = add_project(&repo).await;

    let err = exec(
        &repo,
        &["claim", "simple", "--project", &project, "--number", "PC-01", "--percent", "120"],
    )
    .await
    .unwrap_err();

    assert!(err.to_string().contains("percent_complete"));
}

#[tokio::test]
async fn itemized_sheet_submit_and_show() {
    let repo = MemoryRepository::new();
    let project = add_project(&repo).await;
    let sheet = fixture("sample_claim.csv");

    let submitted = exec_json(
        &repo,
        &[
            "claim", "itemized", "--project", &project, "--number", "PC-03", "--sheet", &sheet,
            "--payment-received", "100000", "--submit",
        ],
    )
    .await;
    let claim_id = submitted["claim"]["id"].as_i64().unwrap();

    assert_eq!(submitted["claim"]["kind"], "itemized");
    assert_eq!(submitted["claim"]["total_works_completed"], "650000.00");
    assert_eq!(submitted["claim"]["sub_total"], "548400.00");
    assert_eq!(submitted["claim"]["gst"], "54840.00");
    assert_eq!(submitted["claim"]["total_inc_gst"], "603240.00");
    assert_eq!(submitted["claim"]["retention_held"], "0.00");
    assert_eq!(submitted["items"].as_array().unwrap().len(), 3);

    let stored = repo.get_claim(claim_id).await.unwrap();
    assert_eq!(stored.kind, ClaimKind::Itemized);
    assert_eq!(repo.list_variations(claim_id).await.unwrap().len(), 2);

    let shown = exec(&repo, &["claim", "show", &claim_id.to_string()]).await.unwrap();
    assert!(shown.contains("WAREHOUSE"));
    assert!(shown.contains("Extra bollards"));
    assert!(shown.contains("Unused provisional sum"));
}

#[tokio::test]
async fn attachments_are_listed_with_the_claim() {
    let repo = MemoryRepository::new();
    let project = add_project(&repo).await;
    let submitted = exec_json(
        &repo,
        &[
            "claim", "simple", "--project", &project, "--number", "PC-04", "--percent", "10",
            "--submit",
        ],
    )
    .await;
    let claim = submitted["claim"]["id"].to_string();

    exec(
        &repo,
        &[
            "attachment", "add", "--claim", &claim, "--file-name", "progress.pdf", "--url",
            "https://files.example.com/progress.pdf", "--size", "20480",
        ],
    )
    .await
    .unwrap();

    let listed = exec_json(&repo, &["attachment", "list", "--claim", &claim]).await;
    assert_eq!(listed[0]["file_name"], "progress.pdf");

    let shown = exec_json(&repo, &["claim", "show", &claim]).await;
    assert_eq!(shown["attachments"][0]["file_size"], 20480);
    assert_eq!(shown["claim"]["number"], "PC-04");
}

#[tokio::test]
async fn project_delete_removes_its_claims() {
    let repo = MemoryRepository::new();
    let project = add_project(&repo).await;
    exec(
        &repo,
        &[
            "claim", "simple", "--project", &project, "--number", "PC-05", "--percent", "20",
            "--submit",
        ],
    )
    .await
    .unwrap();

    exec(&repo, &["project", "delete", &project]).await.unwrap();

    assert!(repo.list_recent_claims(10).await.unwrap().is_empty());
    let recent = exec(&repo, &["claim", "recent"]).await.unwrap();
    assert_eq!(recent, "No claims.\n");
}

#[tokio::test]
async fn unknown_status_is_refused() {
    let repo = MemoryRepository::new();

    let err = exec(&repo, &["claim", "status", "1", "paid"]).await.unwrap_err();

    assert!(err.to_string().contains("unknown claim status 'paid'"));
}
