//! Scripted in-memory account site implementing `RemoteSurface`.
//!
//! The site keeps a balance, a donation flag and VIP weeks, renders a store
//! page from them, and applies donations and purchases when its controls are
//! clicked, acknowledging each one the way the real store does.

#![allow(dead_code)]

use anyhow::{bail, Result};
use async_trait::async_trait;
use bonus_plan::group_thousands;
use bonus_steward::config::Config;
use bonus_steward::surface::{
    AckMatcher, Acknowledgment, Container, Control, Dialog, Field, NavigationResult,
    RemoteSurface,
};
use std::collections::HashMap;
use std::path::Path;

pub const LOGIN_URL: &str = "https://site.test/login.php?returnto=%2Fstore.php";
pub const STORE_URL: &str = "https://site.test/store.php";

const DONATE: usize = 0;
const VIP: usize = 1;
const UPLOAD: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Page {
    Blank,
    Login,
    Store,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Pending {
    Vip { weeks: u32, cost: u64 },
    Upload { amount: u64 },
}

/// Site behavior and state.
#[derive(Debug, Clone)]
pub struct FakeSite {
    pub bonus: u64,
    pub donated_today: bool,
    pub vip_weeks: f64,
    /// VIP section present on the store page.
    pub vip_section: bool,
    /// Purchases ask for confirmation in a dialog.
    pub confirm_dialogs: bool,
    /// VIP tiers costing more than this are refused.
    pub vip_max_cost: u64,
    /// Store page shows a maintenance notice instead of the account.
    pub hide_balance: bool,
    /// Login submit bounces back to the login page.
    pub reject_login: bool,
    /// Purchases go through but no response is ever observed.
    pub drop_acks: bool,
    /// With `drop_acks`, a message dialog reports the outcome instead.
    pub late_message: bool,
    /// The balance disappears from the store page after the first spend.
    pub hide_balance_after_spend: bool,

    page: Page,
    url: String,
    logged_in: bool,
    spent: bool,
    values: HashMap<(usize, usize), String>,
    dialog: Option<(Dialog, Option<Pending>)>,
    acks: Vec<Acknowledgment>,
    /// Labels of every control and dialog button clicked, in order.
    pub clicks: Vec<String>,
}

impl FakeSite {
    pub fn new(bonus: u64) -> Self {
        Self {
            bonus,
            donated_today: false,
            vip_weeks: 0.0,
            vip_section: true,
            confirm_dialogs: true,
            vip_max_cost: u64::MAX,
            hide_balance: false,
            reject_login: false,
            drop_acks: false,
            late_message: false,
            hide_balance_after_spend: false,
            page: Page::Blank,
            url: "about:blank".into(),
            logged_in: false,
            spent: false,
            values: HashMap::new(),
            dialog: None,
            acks: Vec::new(),
            clicks: Vec::new(),
        }
    }

    fn field(index: usize, tag: &str, name: &str) -> Field {
        Field {
            index,
            tag: tag.into(),
            kind: if tag == "input" { "text".into() } else { String::new() },
            name: name.into(),
            id: String::new(),
            placeholder: String::new(),
            options: Vec::new(),
        }
    }

    fn controls(labels: &[&str]) -> Vec<Control> {
        labels
            .iter()
            .enumerate()
            .map(|(index, label)| Control {
                index,
                label: label.to_string(),
            })
            .collect()
    }

    fn store_containers(&self) -> Vec<Container> {
        let mut list = vec![Container {
            index: DONATE,
            text: "Millionaire's Club: donate points to the vault".into(),
            controls: Self::controls(&["Donate"]),
            fields: vec![Self::field(0, "input", "points")],
        }];
        if self.vip_section {
            list.push(Container {
                index: VIP,
                text: "VIP status: extend your membership".into(),
                controls: Self::controls(&["Buy 4 weeks", "Buy 8 weeks", "Buy 12 weeks", "Max VIP"]),
                fields: Vec::new(),
            });
        }
        list.push(Container {
            index: UPLOAD,
            text: "Upload credit: 500 points per GB".into(),
            controls: Self::controls(&["Exchange", "Max"]),
            fields: vec![Self::field(0, "input", "upload_points")],
        });
        list
    }

    fn login_containers(&self) -> Vec<Container> {
        vec![Container {
            index: 0,
            text: "Log in".into(),
            controls: Self::controls(&["Log in!"]),
            fields: vec![Self::field(0, "input", "email"), Self::field(1, "input", "password")],
        }]
    }

    fn store_text(&self) -> String {
        if self.hide_balance || (self.hide_balance_after_spend && self.spent) {
            return "Home Browse Requests Forums\nThe store is closed for maintenance.".into();
        }
        let mut lines = vec![
            "Home Browse Requests Forums".to_string(),
            format!("Bonus Points: {}", group_thousands(self.bonus)),
        ];
        lines.push("Millionaire's Club".into());
        if self.donated_today {
            lines.push("You have already donated today.".into());
        } else {
            lines.push("You may donate up to 2,000 points per day.".into());
        }
        if self.vip_weeks > 0.0 {
            lines.push(format!("Your VIP status expires in {} weeks", self.vip_weeks));
        }
        lines.push("Buy VIP: 4 weeks cost 5,000 bonus points".into());
        lines.push("Upload credit: 500 bonus points per GB".into());
        lines.join("\n")
    }

    fn acknowledge(&mut self, url: String, success: bool) {
        if success {
            self.spent = true;
        }
        if self.drop_acks {
            if self.late_message {
                let text = if success {
                    "Thank you, your purchase is complete."
                } else {
                    "You do not have enough points for that."
                };
                let dialog = Dialog {
                    text: text.into(),
                    buttons: vec!["OK".into()],
                };
                self.dialog = Some((dialog, None));
            }
            return;
        }
        let body = if success {
            format!(r#"{{"success":true,"seedbonus":{}}}"#, self.bonus)
        } else {
            r#"{"success":false,"error":"That purchase is not available"}"#.to_string()
        };
        self.acks.push(Acknowledgment {
            url,
            status: 200,
            body: Some(body),
        });
    }

    fn amount_in(&self, container: usize) -> u64 {
        self.values
            .get(&(container, 0))
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    }

    fn donate(&mut self) {
        let amount = self.amount_in(DONATE);
        let ok = !self.donated_today && amount > 0 && amount <= self.bonus;
        if ok {
            self.bonus -= amount;
            self.donated_today = true;
        }
        self.acknowledge("https://site.test/millionaires/donate.php".into(), ok);
    }

    fn execute(&mut self, pending: Pending) {
        match pending {
            Pending::Vip { weeks, cost } => {
                let ok = cost <= self.vip_max_cost && cost <= self.bonus;
                if ok {
                    self.bonus -= cost;
                    self.vip_weeks += f64::from(weeks);
                }
                self.acknowledge(
                    format!("https://site.test/json/bonusBuy.php?spendtype=VIP&duration={weeks}"),
                    ok,
                );
            }
            Pending::Upload { amount } => {
                let ok = amount > 0 && amount <= self.bonus;
                if ok {
                    self.bonus -= amount;
                }
                self.acknowledge(
                    format!("https://site.test/json/bonusBuy.php?spendtype=upload&amount={amount}"),
                    ok,
                );
            }
        }
    }

    fn ask(&mut self, pending: Pending, text: String) {
        if self.confirm_dialogs {
            let dialog = Dialog {
                text,
                buttons: vec!["Yes".into(), "No".into()],
            };
            self.dialog = Some((dialog, Some(pending)));
        }
    }
}

#[async_trait]
impl RemoteSurface for FakeSite {
    async fn navigate(&mut self, url: &str, _timeout_ms: u64) -> Result<NavigationResult> {
        self.dialog = None;
        if url.contains("/login.php") || !self.logged_in {
            self.page = Page::Login;
            self.url = LOGIN_URL.into();
        } else {
            self.page = Page::Store;
            self.url = url.into();
        }
        Ok(NavigationResult {
            final_url: self.url.clone(),
            load_time_ms: 1,
        })
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.url.clone())
    }

    async fn page_text(&self) -> Result<String> {
        Ok(match self.page {
            Page::Blank => String::new(),
            Page::Login if self.reject_login => {
                "Login failed! You have a failed login attempt.".into()
            }
            Page::Login => "Log in".into(),
            Page::Store => self.store_text(),
        })
    }

    async fn page_html(&self) -> Result<String> {
        let text = self.page_text().await?;
        Ok(format!("<html><body><pre>{text}</pre></body></html>"))
    }

    async fn element_text(&self, _selector: &str) -> Result<Option<String>> {
        Ok(None)
    }

    async fn containers(&self) -> Result<Vec<Container>> {
        Ok(match self.page {
            Page::Blank => Vec::new(),
            Page::Login => self.login_containers(),
            Page::Store => self.store_containers(),
        })
    }

    async fn set_field(&mut self, container: usize, field: usize, value: &str) -> Result<()> {
        self.values.insert((container, field), value.to_string());
        Ok(())
    }

    async fn click_control(&mut self, container: usize, control: usize) -> Result<()> {
        self.acks.clear();
        let containers = self.containers().await?;
        let Some(label) = containers
            .iter()
            .find(|c| c.index == container)
            .and_then(|c| c.controls.get(control))
            .map(|c| c.label.clone())
        else {
            bail!("no control {control} in container {container}");
        };
        self.clicks.push(label.clone());

        match (self.page, container) {
            (Page::Login, _) => {
                if !self.reject_login {
                    self.logged_in = true;
                    self.page = Page::Store;
                    self.url = STORE_URL.into();
                }
            }
            (Page::Store, DONATE) => self.donate(),
            (Page::Store, VIP) => {
                let tier = match label.as_str() {
                    "Buy 4 weeks" => Some((4, 5_000)),
                    "Buy 8 weeks" => Some((8, 10_000)),
                    "Buy 12 weeks" => Some((12, 15_000)),
                    _ => None,
                };
                if let Some((weeks, cost)) = tier {
                    self.ask(
                        Pending::Vip { weeks, cost },
                        format!("Spend {} points on {weeks} weeks of VIP?", group_thousands(cost)),
                    );
                }
            }
            (Page::Store, UPLOAD) if label == "Exchange" => {
                let amount = self.amount_in(UPLOAD);
                self.ask(
                    Pending::Upload { amount },
                    format!("Spend {} points on upload credit?", group_thousands(amount)),
                );
            }
            _ => {}
        }
        Ok(())
    }

    async fn wait_for_dialog(&mut self, _timeout_ms: u64) -> Result<Option<Dialog>> {
        Ok(self.dialog.as_ref().map(|(dialog, _)| dialog.clone()))
    }

    async fn click_dialog_button(&mut self, keywords: &[&str]) -> Result<Option<String>> {
        let Some((dialog, pending)) = self.dialog.take() else {
            return Ok(None);
        };
        let button = dialog
            .buttons
            .iter()
            .find(|b| keywords.iter().any(|k| b.to_lowercase().contains(k)))
            .cloned();
        if let Some(label) = &button {
            self.clicks.push(label.clone());
            if let Some(pending) = pending {
                self.execute(pending);
            }
        }
        Ok(button)
    }

    async fn wait_for_acknowledgment(
        &mut self,
        matcher: &AckMatcher,
        _timeout_ms: u64,
    ) -> Result<Option<Acknowledgment>> {
        Ok(self.acks.iter().find(|a| matcher.matches(&a.url)).cloned())
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        Ok(b"\x89PNG".to_vec())
    }

    async fn settle(&mut self) {}

    async fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

/// Config pointing at the fake site, with artifacts under `debug_dir`.
pub fn config(apply: bool, debug_dir: &Path) -> Config {
    let mut env: HashMap<&str, String> = HashMap::new();
    env.insert("MAM_EMAIL", "reader@example.net".into());
    env.insert("MAM_PASSWORD", "hunter2".into());
    env.insert("MAM_LOGIN_URL", LOGIN_URL.into());
    env.insert("MAM_STORE_URL", STORE_URL.into());
    env.insert("MAM_APPLY", apply.to_string());
    env.insert("MAM_DEBUG_DIR", debug_dir.display().to_string());
    env.insert("MAM_TIMEOUT_MS", "1000".into());
    Config::from_lookup(|key| env.get(key).cloned())
}
