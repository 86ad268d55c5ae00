//! Static company dataset backing the demo actions

use serde::{Deserialize, Serialize};

/// One company record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub company_id: u32,
    pub company_name: String,
    pub industry_sector: String,
    pub revenue: u64,
    pub expenses: u64,
    pub profit: u64,
    pub employees: u32,
}

// (id, name, sector, revenue, expenses, profit, employees)
const COMPANIES: &[(u32, &str, &str, u64, u64, u64, u32)] = &[
    (1, "TechNova Inc.", "Technology", 10000, 3000, 7000, 10),
    (2, "QuantumLeap Technologies", "Technology", 20000, 4000, 16000, 10),
    (3, "CyberSecure IT", "Technology", 30000, 5000, 25000, 10),
    (4, "DigitalDreams Gaming", "Technology", 40000, 6000, 34000, 10),
    (5, "NanoMed Pharmaceuticals", "Technology", 50000, 7000, 43000, 10),
    (6, "RoboTech Industries", "Technology", 60000, 8000, 52000, 12),
    (7, "FutureNet Solutions", "Technology", 60000, 9000, 51000, 10),
    (8, "InnovativeAI Corp", "Technology", 65000, 10000, 55000, 15),
    (9, "EcoTech Energy", "Technology", 70000, 11000, 59000, 10),
    (10, "TechHealth Systems", "Technology", 80000, 12000, 68000, 10),
    (11, "LuxuryLiving Real Estate", "Real Estate", 90000, 13000, 77000, 10),
    (12, "UrbanDevelopers Inc.", "Real Estate", 100000, 14000, 86000, 10),
    (13, "SkyHigh Towers", "Real Estate", 110000, 15000, 95000, 18),
    (14, "GreenSpace Properties", "Real Estate", 120000, 16000, 104000, 10),
    (15, "ModernHomes Ltd.", "Real Estate", 130000, 17000, 113000, 10),
    (16, "Cityscape Estates", "Real Estate", 140000, 18000, 122000, 10),
    (17, "CoastalRealty Group", "Real Estate", 150000, 19000, 131000, 10),
    (18, "InnovativeLiving Spaces", "Real Estate", 160000, 20000, 140000, 10),
    (19, "GlobalProperties Alliance", "Real Estate", 170000, 21000, 149000, 11),
    (20, "NextGen Residences", "Real Estate", 180000, 22000, 158000, 260),
];

/// All companies, ordered by id.
pub fn companies() -> Vec<Company> {
    COMPANIES
        .iter()
        .map(|&(id, name, sector, revenue, expenses, profit, employees)| Company {
            company_id: id,
            company_name: name.to_string(),
            industry_sector: sector.to_string(),
            revenue,
            expenses,
            profit,
            employees,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dataset_shape() {
        let all = companies();
        assert_eq!(all.len(), 20);
        assert_eq!(all.iter().filter(|c| c.industry_sector == "Real Estate").count(), 10);
        assert!(all.iter().all(|c| c.revenue - c.expenses == c.profit));
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(&companies()[0]).unwrap();
        assert_eq!(json["companyName"], "TechNova Inc.");
        assert_eq!(json["industrySector"], "Technology");
    }
}
