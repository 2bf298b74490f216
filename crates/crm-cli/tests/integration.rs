#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn crm(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("crm").unwrap();
    cmd.current_dir(dir.path())
        .env("CRM_ROOT", dir.path())
        .env_remove("CRM_USER")
        .env_remove("RUST_LOG");
    cmd
}

fn init_project(dir: &TempDir) {
    crm(dir).arg("init").assert().success();
}

fn state_yaml(dir: &TempDir) -> serde_yaml::Value {
    let data = std::fs::read_to_string(dir.path().join(".crm/state.yaml")).unwrap();
    serde_yaml::from_str(&data).unwrap()
}

fn edit_config(dir: &TempDir, edit: impl FnOnce(&mut serde_yaml::Value)) {
    let path = dir.path().join(".crm/config.yaml");
    let mut cfg: serde_yaml::Value =
        serde_yaml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    edit(&mut cfg);
    std::fs::write(&path, serde_yaml::to_string(&cfg).unwrap()).unwrap();
}

fn json_output(cmd: &mut Command) -> serde_json::Value {
    let out = cmd.arg("--json").assert().success().get_output().stdout.clone();
    serde_json::from_slice(&out).unwrap()
}

/// Log a qualified visit as 张三 and submit it; returns the application code.
fn submit_application(dir: &TempDir) -> String {
    crm(dir)
        .args([
            "visit",
            "log",
            "--customer",
            "上海星辰科技",
            "--date",
            "2024-05-20",
            "--stage",
            "需求确认",
        ])
        .assert()
        .success();
    let out = json_output(crm(dir).args([
        "application",
        "submit",
        "V1",
        "--amount",
        "1000000",
        "--product-line",
        "AI 平台",
        "--probability",
        "60%",
    ]));
    out["effect"]["code"].as_str().unwrap().to_string()
}

// ---------------------------------------------------------------------------
// crm init
// ---------------------------------------------------------------------------

#[test]
fn init_creates_store() {
    let dir = TempDir::new().unwrap();
    crm(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("created: .crm/config.yaml"));

    assert!(dir.path().join(".crm/config.yaml").exists());
    assert!(dir.path().join(".crm/state.yaml").exists());
}

#[test]
fn init_is_idempotent() {
    let dir = TempDir::new().unwrap();
    crm(&dir).arg("init").assert().success();
    crm(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already initialized"));
}

#[test]
fn commands_require_init() {
    let dir = TempDir::new().unwrap();
    crm(&dir)
        .args(["customer", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not initialized: run 'crm init'"));
}

// ---------------------------------------------------------------------------
// crm user
// ---------------------------------------------------------------------------

#[test]
fn user_switch_toggles_role() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);

    crm(&dir)
        .args(["user", "whoami"])
        .assert()
        .success()
        .stdout(predicate::str::contains("张三 (销售人员)"));
    crm(&dir)
        .args(["user", "switch"])
        .assert()
        .success()
        .stdout(predicate::str::contains("李管理 (管理者)"));
    crm(&dir)
        .args(["user", "whoami"])
        .assert()
        .success()
        .stdout(predicate::str::contains("李管理"));
}

#[test]
fn as_flag_overrides_active_user() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    crm(&dir)
        .args(["--as", "李管理", "user", "whoami"])
        .assert()
        .success()
        .stdout(predicate::str::contains("李管理"));
    crm(&dir)
        .args(["--as", "nobody", "user", "whoami"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("用户不存在: nobody"));
}

// ---------------------------------------------------------------------------
// crm customer
// ---------------------------------------------------------------------------

#[test]
fn customer_create_and_edit() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);

    crm(&dir)
        .args([
            "customer",
            "create",
            "--name",
            "上海星辰科技",
            "--industry",
            "软件",
            "--tier",
            "A",
            "--website",
            "https://xingchen.example.com",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("创建成功"));

    crm(&dir)
        .args(["customer", "edit", "C1", "--tier", "B"])
        .assert()
        .success()
        .stdout(predicate::str::contains("客户信息更新成功"));

    let shown = json_output(crm(&dir).args(["customer", "show", "C1"]));
    assert_eq!(shown["tier"], "b");
    assert_eq!(shown["industry"], "software");
    assert_eq!(shown["change_log"].as_array().unwrap().len(), 1);
    assert_eq!(shown["change_log"][0]["field"], "客户分层");
}

#[test]
fn customer_missing_field_is_refused_and_noticed() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);

    crm(&dir)
        .args(["customer", "create", "--name", "上海星辰科技", "--tier", "A"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("客户行业为必填项"));

    let state = state_yaml(&dir);
    assert!(state["customers"].as_sequence().unwrap().is_empty());

    crm(&dir)
        .arg("notice")
        .assert()
        .success()
        .stdout(predicate::str::contains("客户行业为必填项"));
}

#[test]
fn customer_bad_website_is_refused() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    crm(&dir)
        .args([
            "customer",
            "create",
            "--name",
            "A公司",
            "--industry",
            "金融",
            "--tier",
            "C",
            "--website",
            "not a url",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("请输入有效的网址"));
}

#[test]
fn editing_unknown_customer_names_the_id() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    crm(&dir)
        .args(["customer", "edit", "C99", "--tier", "B"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("客户不存在: C99"));

    crm(&dir)
        .arg("notice")
        .assert()
        .success()
        .stdout(predicate::str::contains("客户不存在: C99"));
}

// ---------------------------------------------------------------------------
// crm visit
// ---------------------------------------------------------------------------

#[test]
fn visits_are_scoped_by_role() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    crm(&dir)
        .args([
            "visit",
            "log",
            "--customer",
            "A公司",
            "--date",
            "2024-05-01",
            "--stage",
            "初次接触",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("拜访记录创建成功"));

    let mine = json_output(crm(&dir).args(["visit", "list"]));
    assert_eq!(mine.as_array().unwrap().len(), 1);

    // A second salesperson added through the config sees nothing.
    edit_config(&dir, |cfg| {
        let user: serde_yaml::Value =
            serde_yaml::from_str("{id: user_002, name: 王五, role: salesperson}").unwrap();
        cfg["users"].as_sequence_mut().unwrap().push(user);
    });

    let theirs = json_output(crm(&dir).args(["--as", "王五", "visit", "list"]));
    assert!(theirs.as_array().unwrap().is_empty());
    let all = json_output(crm(&dir).args(["--as", "李管理", "visit", "list"]));
    assert_eq!(all.as_array().unwrap().len(), 1);

    let eligible = json_output(crm(&dir).args(["visit", "eligible"]));
    assert!(eligible.as_array().unwrap().is_empty());
}

#[test]
fn visit_bad_date_is_refused() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    crm(&dir)
        .args([
            "visit",
            "log",
            "--customer",
            "A公司",
            "--date",
            "2024/05/01",
            "--stage",
            "初次接触",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("拜访日期格式无效"));
}

// ---------------------------------------------------------------------------
// crm application
// ---------------------------------------------------------------------------

#[test]
fn manager_approval_creates_opportunity() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    let code = submit_application(&dir);
    assert_eq!(code, "OP-001");

    crm(&dir)
        .args(["--as", "李管理", "application", "approve", &code])
        .assert()
        .success()
        .stdout(predicate::str::contains("商机申请OP-001已通过审批"));

    let opps = json_output(crm(&dir).args(["opportunity", "list"]));
    let opps = opps.as_array().unwrap();
    assert_eq!(opps.len(), 1);
    assert_eq!(opps[0]["code"], "OP-001");
    assert_eq!(opps[0]["stage"], "evaluation");
    assert_eq!(opps[0]["status"], "open");
    assert_eq!(opps[0]["customer"], "上海星辰科技");

    let summary = json_output(crm(&dir).args(["application", "summary"]));
    assert_eq!(summary["approved"], 1);
    assert_eq!(summary["pending"], 0);
}

#[test]
fn salesperson_cannot_approve() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    let code = submit_application(&dir);

    crm(&dir)
        .args(["application", "approve", &code])
        .assert()
        .failure()
        .stderr(predicate::str::contains("无审批权限"));

    let state = state_yaml(&dir);
    assert_eq!(state["applications"][0]["status"], "pending");
    assert!(state["opportunities"].as_sequence().unwrap().is_empty());

    crm(&dir)
        .arg("notice")
        .assert()
        .success()
        .stdout(predicate::str::contains("无审批权限"));
}

#[test]
fn blank_rejection_reason_changes_nothing() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    let code = submit_application(&dir);

    crm(&dir)
        .args(["--as", "李管理", "application", "reject", &code, "   "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("驳回原因为必填项"));

    let state = state_yaml(&dir);
    assert_eq!(state["applications"][0]["status"], "pending");
    assert!(state["applications"][0]["rejection_reason"].is_null());
}

#[test]
fn rejection_records_reason() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    let code = submit_application(&dir);

    crm(&dir)
        .args(["--as", "李管理", "application", "reject", &code, "预算", "不足"])
        .assert()
        .success()
        .stdout(predicate::str::contains("商机申请OP-001已驳回，原因：预算 不足"));

    let rejected = json_output(crm(&dir).args(["application", "list", "--status", "rejected"]));
    assert_eq!(rejected.as_array().unwrap().len(), 1);
    assert_eq!(rejected[0]["rejection_reason"], "预算 不足");
}

#[test]
fn ineligible_visit_cannot_be_submitted() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    crm(&dir)
        .args([
            "visit",
            "log",
            "--customer",
            "A公司",
            "--date",
            "2024-05-01",
            "--stage",
            "first_contact",
        ])
        .assert()
        .success();
    crm(&dir)
        .args([
            "application",
            "submit",
            "V1",
            "--amount",
            "5000",
            "--product-line",
            "crm",
            "--probability",
            "30%",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("拜访记录不可转商机: V1"));
}

// ---------------------------------------------------------------------------
// crm opportunity / report
// ---------------------------------------------------------------------------

#[test]
fn stage_changes_and_settlement() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    let code = submit_application(&dir);
    crm(&dir)
        .args(["--as", "李管理", "application", "approve", &code])
        .assert()
        .success();

    crm(&dir)
        .args(["opportunity", "stage", &code, "方案制定"])
        .assert()
        .success()
        .stdout(predicate::str::contains("商机OP-001阶段已更新为方案制定"));
    crm(&dir)
        .args(["opportunity", "stage", &code, "negotiation"])
        .assert()
        .success();
    crm(&dir)
        .args(["--as", "李管理", "opportunity", "stage", &code, "proposal"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("仅商机负责人可变更阶段"));
    crm(&dir)
        .args(["opportunity", "settle", &code, "won"])
        .assert()
        .success()
        .stdout(predicate::str::contains("商机OP-001已标记为成交"));

    let opp = json_output(crm(&dir).args(["opportunity", "show", &code]));
    assert_eq!(opp["status"], "won");
    assert_eq!(opp["stage"], "settlement");
    assert_eq!(opp["stage_history"].as_array().unwrap().len(), 3);
}

#[test]
fn opportunity_show_is_scoped_to_owner() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    let code = submit_application(&dir);
    crm(&dir)
        .args(["--as", "李管理", "application", "approve", &code])
        .assert()
        .success();
    edit_config(&dir, |cfg| {
        let user: serde_yaml::Value =
            serde_yaml::from_str("{id: user_002, name: 王五, role: salesperson}").unwrap();
        cfg["users"].as_sequence_mut().unwrap().push(user);
    });

    crm(&dir)
        .args(["--as", "王五", "opportunity", "show", &code])
        .assert()
        .failure()
        .stderr(predicate::str::contains("商机不存在: OP-001"));

    let own = json_output(crm(&dir).args(["opportunity", "show", &code]));
    assert_eq!(own["owner"], "张三");
    let managed = json_output(crm(&dir).args(["--as", "李管理", "opportunity", "show", &code]));
    assert_eq!(managed["code"], "OP-001");
}

#[test]
fn ranking_is_manager_only() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    let code = submit_application(&dir);
    crm(&dir)
        .args(["--as", "李管理", "application", "approve", &code])
        .assert()
        .success();

    crm(&dir)
        .args(["report", "ranking"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("仅管理者可查看销售排名"));

    let board = json_output(crm(&dir).args(["--as", "李管理", "report", "ranking"]));
    let board = board.as_array().unwrap();
    assert_eq!(board.len(), 1);
    assert_eq!(board[0]["salesperson"], "张三");
    assert_eq!(board[0]["visits"], 1);
    assert_eq!(board[0]["applications"], 1);
    assert_eq!(board[0]["opportunities"], 1);
}

#[test]
fn funnel_and_conversion() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    let code = submit_application(&dir);
    crm(&dir)
        .args(["--as", "李管理", "application", "approve", &code])
        .assert()
        .success();

    let funnel = json_output(crm(&dir).args(["report", "funnel"]));
    assert_eq!(funnel["total_count"], 1);
    assert_eq!(funnel["active_stages"], 1);
    assert_eq!(funnel["rows"][0]["count"], 1);
    assert_eq!(funnel["rows"][0]["amount"], "1000000");

    let all = json_output(crm(&dir).args(["report", "conversion", "--period", "all"]));
    assert_eq!(all["visits"], 1);
    assert_eq!(all["applications"], 1);
    assert_eq!(all["rate"], 100);
}

// ---------------------------------------------------------------------------
// crm config
// ---------------------------------------------------------------------------

#[test]
fn config_validate_default_is_clean() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    crm(&dir)
        .args(["config", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Config is valid"));
}

#[test]
fn config_validate_reports_errors() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    edit_config(&dir, |cfg| {
        cfg["active_user"] = serde_yaml::Value::from("ghost");
    });

    crm(&dir)
        .args(["config", "validate"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("active_user 'ghost' is not in the roster"));
}
