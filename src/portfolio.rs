use std::collections::BTreeMap;

use crate::models::ClientAccount;

pub const CURRENT_PORTFOLIO: &str = "VIGENTE";
pub const DELINQUENT_BUCKET: &str = "Morosos sin vencimiento";
pub const NO_DAY_BUCKET: &str = "Sin día asignado";
pub const SEARCH_MIN_CHARS: usize = 3;

// Accent-folded, lowercase weekday names.
const WEEKDAYS: &[(&str, u8)] = &[
    ("lunes", 1),
    ("martes", 2),
    ("miercoles", 3),
    ("jueves", 4),
    ("viernes", 5),
    ("sabado", 6),
    ("domingo", 7),
];

#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioGroup {
    pub day_key: String,
    pub clients: Vec<ClientAccount>,
    pub is_delinquent_bucket: bool,
}

impl PortfolioGroup {
    pub fn count(&self) -> usize {
        self.clients.len()
    }

    pub fn total_arrears(&self) -> f64 {
        self.clients.iter().map(|c| c.arrears_amount).sum()
    }
}

fn fold_accents(c: char) -> char {
    match c {
        'á' | 'à' | 'ä' | 'â' => 'a',
        'é' | 'è' | 'ë' | 'ê' => 'e',
        'í' | 'ì' | 'ï' | 'î' => 'i',
        'ó' | 'ò' | 'ö' | 'ô' => 'o',
        'ú' | 'ù' | 'ü' | 'û' => 'u',
        other => other,
    }
}

// Decomposed input (NFD) carries accents as separate marks.
fn is_combining_mark(c: char) -> bool {
    ('\u{300}'..='\u{36f}').contains(&c)
}

pub fn normalize_day(label: &str) -> String {
    label
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| !is_combining_mark(*c))
        .map(fold_accents)
        .collect()
}

/// Monday = 1 .. Sunday = 7 for a Spanish weekday name, ignoring case,
/// surrounding whitespace and accents.
pub fn weekday_rank(label: &str) -> Option<u8> {
    let key = normalize_day(label);
    WEEKDAYS.iter().find(|(name, _)| *name == key).map(|(_, rank)| *rank)
}

pub fn is_delinquent(account: &ClientAccount) -> bool {
    account.arrears_amount > 0.0 && account.portfolio_type != CURRENT_PORTFOLIO
}

pub fn is_current(account: &ClientAccount) -> bool {
    account.portfolio_type == CURRENT_PORTFOLIO
}

fn sort_by_name(clients: &mut [ClientAccount]) {
    clients.sort_by_cached_key(|c| c.client_name.to_lowercase());
}

/// Narrow `accounts` by a search term over client name and credit number.
/// Terms shorter than [`SEARCH_MIN_CHARS`] leave the list untouched.
pub fn filter_accounts(accounts: &[ClientAccount], term: &str) -> Vec<ClientAccount> {
    let term = term.trim();
    if term.chars().count() < SEARCH_MIN_CHARS {
        return accounts.to_vec();
    }
    let needle = term.to_lowercase();
    accounts
        .iter()
        .filter(|a| {
            a.client_name.to_lowercase().contains(&needle)
                || a.credit_number.to_lowercase().contains(&needle)
        })
        .cloned()
        .collect()
}

/// Bucket the portfolio by payment day in weekday order, followed by the
/// delinquent bucket when it has any clients. Accounts that are neither
/// current nor delinquent are left out.
pub fn group_accounts(accounts: &[ClientAccount]) -> Vec<PortfolioGroup> {
    let mut by_day: BTreeMap<String, Vec<ClientAccount>> = BTreeMap::new();
    let mut delinquent = Vec::new();

    for account in accounts {
        if is_delinquent(account) {
            delinquent.push(account.clone());
        } else if is_current(account) {
            let day = account.payment_day.trim();
            let key = if day.is_empty() {
                NO_DAY_BUCKET.to_string()
            } else {
                account.payment_day.clone()
            };
            by_day.entry(key).or_default().push(account.clone());
        }
    }

    let mut groups: Vec<PortfolioGroup> = by_day
        .into_iter()
        .map(|(day_key, mut clients)| {
            sort_by_name(&mut clients);
            PortfolioGroup {
                day_key,
                clients,
                is_delinquent_bucket: false,
            }
        })
        .collect();
    // BTreeMap iteration already orders equal ranks by label.
    groups.sort_by_key(|g| weekday_rank(&g.day_key).unwrap_or(u8::MAX));

    if !delinquent.is_empty() {
        sort_by_name(&mut delinquent);
        groups.push(PortfolioGroup {
            day_key: DELINQUENT_BUCKET.to_string(),
            clients: delinquent,
            is_delinquent_bucket: true,
        });
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(name: &str, day: &str, portfolio_type: &str, arrears: f64) -> ClientAccount {
        ClientAccount {
            credit_number: format!("CR-{name}"),
            client_name: name.to_string(),
            payment_day: day.to_string(),
            arrears_amount: arrears,
            portfolio_type: portfolio_type.to_string(),
            ..Default::default()
        }
    }

    fn names(group: &PortfolioGroup) -> Vec<&str> {
        group.clients.iter().map(|c| c.client_name.as_str()).collect()
    }

    #[test]
    fn test_groups_by_weekday_then_delinquent() {
        let accounts = vec![
            account("B", "Lunes", "VIGENTE", 0.0),
            account("a", "Lunes", "VIGENTE", 0.0),
            account("C", "Martes", "VIGENTE", 0.0),
            account("D", "", "VENCIDA", 50.0),
        ];
        let groups = group_accounts(&accounts);
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].day_key, "Lunes");
        assert_eq!(names(&groups[0]), vec!["a", "B"]);
        assert_eq!(groups[1].day_key, "Martes");
        assert_eq!(names(&groups[1]), vec!["C"]);
        assert_eq!(groups[2].day_key, DELINQUENT_BUCKET);
        assert_eq!(names(&groups[2]), vec!["D"]);
        assert!(groups[2].is_delinquent_bucket);
        assert!(!groups[0].is_delinquent_bucket);
        assert_eq!(groups[0].count(), 2);
    }

    #[test]
    fn test_overdue_without_arrears_is_dropped() {
        let accounts = vec![
            account("E", "Lunes", "VENCIDA", 0.0),
            account("F", "Jueves", "VIGENTE", 0.0),
        ];
        let groups = group_accounts(&accounts);
        assert_eq!(groups.len(), 1);
        assert_eq!(names(&groups[0]), vec!["F"]);
        assert!(groups.iter().all(|g| g.clients.iter().all(|c| c.client_name != "E")));
    }

    #[test]
    fn test_current_with_arrears_stays_in_day_bucket() {
        let groups = group_accounts(&[account("G", "Viernes", "VIGENTE", 120.0)]);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].day_key, "Viernes");
        assert!(!groups[0].is_delinquent_bucket);
    }

    #[test]
    fn test_weekday_order_ignores_accents_and_case() {
        let accounts = vec![
            account("s", "Sábado", "VIGENTE", 0.0),
            account("m", "MIÉRCOLES", "VIGENTE", 0.0),
            account("d", "domingo", "VIGENTE", 0.0),
            account("l", " lunes ", "VIGENTE", 0.0),
        ];
        let days: Vec<String> = group_accounts(&accounts).into_iter().map(|g| g.day_key).collect();
        assert_eq!(days, vec![" lunes ", "MIÉRCOLES", "Sábado", "domingo"]);
    }

    #[test]
    fn test_unknown_and_missing_days_sort_last() {
        let accounts = vec![
            account("x", "Quincenal", "VIGENTE", 0.0),
            account("y", "", "VIGENTE", 0.0),
            account("z", "Domingo", "VIGENTE", 0.0),
            account("w", "Moroso", "VENCIDA", 10.0),
        ];
        let days: Vec<String> = group_accounts(&accounts).into_iter().map(|g| g.day_key).collect();
        assert_eq!(days, vec!["Domingo", "Quincenal", NO_DAY_BUCKET, DELINQUENT_BUCKET]);
    }

    #[test]
    fn test_no_delinquent_bucket_when_empty() {
        let groups = group_accounts(&[account("a", "Lunes", "VIGENTE", 0.0)]);
        assert!(groups.iter().all(|g| !g.is_delinquent_bucket));
        assert!(group_accounts(&[]).is_empty());
    }

    #[test]
    fn test_weekday_rank_table() {
        assert_eq!(weekday_rank("Lunes"), Some(1));
        assert_eq!(weekday_rank("miércoles"), Some(3));
        assert_eq!(weekday_rank("SABADO"), Some(6));
        assert_eq!(weekday_rank("Domingo"), Some(7));
        assert_eq!(weekday_rank("Monday"), None);
        assert_eq!(weekday_rank(""), None);
    }

    #[test]
    fn test_decomposed_accents_rank_like_precomposed() {
        assert_eq!(weekday_rank("Mie\u{301}rcoles"), Some(3));
        assert_eq!(weekday_rank("SA\u{301}BADO"), Some(6));

        let accounts = vec![
            account("v", "Viernes", "VIGENTE", 0.0),
            account("m", "Mie\u{301}rcoles", "VIGENTE", 0.0),
            account("l", "Lunes", "VIGENTE", 0.0),
        ];
        let days: Vec<String> = group_accounts(&accounts).into_iter().map(|g| g.day_key).collect();
        assert_eq!(days, vec!["Lunes", "Mie\u{301}rcoles", "Viernes"]);
    }

    #[test]
    fn test_short_search_passes_everything_through() {
        let accounts = vec![account("Ana", "Lunes", "VIGENTE", 0.0), account("Beto", "Lunes", "VIGENTE", 0.0)];
        assert_eq!(filter_accounts(&accounts, "an").len(), 2);
        assert_eq!(filter_accounts(&accounts, "  be ").len(), 2);
        assert_eq!(filter_accounts(&accounts, "").len(), 2);
    }

    #[test]
    fn test_search_matches_name_or_credit_case_insensitive() {
        let mut accounts = vec![
            account("Ana Ruiz", "Lunes", "VIGENTE", 0.0),
            account("Beto Paz", "Lunes", "VIGENTE", 0.0),
        ];
        accounts[1].credit_number = "778899".to_string();
        let by_name: Vec<String> = filter_accounts(&accounts, "RUIZ").into_iter().map(|a| a.client_name).collect();
        assert_eq!(by_name, vec!["Ana Ruiz"]);
        let by_credit: Vec<String> = filter_accounts(&accounts, "8899").into_iter().map(|a| a.client_name).collect();
        assert_eq!(by_credit, vec!["Beto Paz"]);
        assert!(filter_accounts(&accounts, "zzz").is_empty());
    }
}
