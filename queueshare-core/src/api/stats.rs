use crate::{
    ApiClient, ApiRequest, ApiResult, DayStreams, FriendComparison, Ranking, RankingKind,
    RankingPeriod,
};

/// Read-only access to a user's listening statistics
#[derive(Debug, Clone)]
pub struct StatsApi {
    client: ApiClient,
}

impl StatsApi {
    pub fn new(client: &ApiClient) -> Self {
        Self {
            client: client.clone(),
        }
    }

    pub async fn rankings(
        &self,
        token: &str,
        kind: RankingKind,
        period: RankingPeriod,
    ) -> ApiResult<Vec<Ranking>> {
        let request = period.query().into_iter().fold(
            ApiRequest::get(format!("/rankings/{}/{}", kind.as_str(), period.as_str()))
                .bearer(token),
            |request, (key, value)| request.query(key, value),
        );

        self.client.send(request).await
    }

    /// Streams per day over a whole year
    pub async fn calendar(&self, token: &str, year: i32) -> ApiResult<Vec<DayStreams>> {
        self.client
            .send(
                ApiRequest::get("/stats/calendar")
                    .bearer(token)
                    .query("year", year),
            )
            .await
    }

    pub async fn compare(&self, token: &str, username: &str) -> ApiResult<FriendComparison> {
        self.client
            .send(
                ApiRequest::get("/stats/compare").segment(username)
                    .bearer(token)
                    .expect_fields(&["friend", "mine", "theirs"]),
            )
            .await
    }
}
