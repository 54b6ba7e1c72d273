//! CTDC GraphQL case listing.

use serde::Deserialize;
use serde_json::json;

use super::types::CaseOverview;
use crate::error::CheckError;
use crate::http::HttpClient;

pub const CASE_OVERVIEW_QUERY: &str = "{caseOverview{  case_id  clinical_trial_code  clinical_trial_id  arm_id  arm_drug  disease  gender  race  ethnicity}}";

#[derive(Deserialize)]
struct GraphQlResponse {
    data: Option<CaseOverviewData>,
    #[serde(default)]
    errors: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CaseOverviewData {
    case_overview: Vec<CaseOverview>,
}

/// Every case the CTDC API exposes, in API order.
pub fn fetch_case_overview(http: &HttpClient, api_url: &str) -> Result<Vec<CaseOverview>, CheckError> {
    let resp: GraphQlResponse = http.post_json(api_url, &json!({ "query": CASE_OVERVIEW_QUERY }))?;
    match resp.data {
        Some(d) => Ok(d.case_overview),
        None => Err(CheckError::Decode(format!(
            "no caseOverview data from {} ({} errors)",
            api_url,
            resp.errors.len()
        ))),
    }
}
