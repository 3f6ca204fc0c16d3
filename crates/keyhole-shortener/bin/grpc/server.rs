use keyhole_core::{Repository, ServiceError, TrustedSubnet};
use keyhole_proto_schema::v1 as proto;
use keyhole_proto_schema::v1::shortener_service_server::ShortenerService as ShortenerGrpc;
use keyhole_shortener::ShortenerService;
use std::collections::HashMap;
use tonic::{Request, Response, Status};

pub struct ShortenerGrpcServer<R> {
    service: ShortenerService<R>,
    trusted_subnet: Option<TrustedSubnet>,
}

impl<R: Repository> ShortenerGrpcServer<R> {
    pub fn new(service: ShortenerService<R>, trusted_subnet: Option<TrustedSubnet>) -> Self {
        Self {
            service,
            trusted_subnet,
        }
    }

    /// Owner identity travels in the `user-id` request metadata; calls
    /// without it are rejected rather than attributed to a default owner.
    fn owner_id<T>(request: &Request<T>) -> Result<String, Status> {
        let owner_id = request
            .metadata()
            .get("user-id")
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        if owner_id.is_empty() {
            return Err(Status::unauthenticated("user-id metadata is missing"));
        }
        Ok(owner_id.to_owned())
    }

    /// The stats surface is only reachable from the trusted subnet, judged
    /// by the `x-real-ip` metadata entry.
    fn check_trusted<T>(&self, request: &Request<T>) -> Result<(), Status> {
        let Some(subnet) = self.trusted_subnet else {
            return Err(Status::permission_denied("no trusted subnet configured"));
        };
        let ip = request
            .metadata()
            .get("x-real-ip")
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        if !subnet.contains_str(ip) {
            return Err(Status::permission_denied("caller is not in the trusted subnet"));
        }
        Ok(())
    }
}

fn status_from(err: ServiceError) -> Status {
    match err {
        ServiceError::NotFound | ServiceError::InvalidShortCode(_) => {
            Status::not_found(err.to_string())
        }
        ServiceError::Gone => Status::failed_precondition(err.to_string()),
        ServiceError::CodeSpaceExhausted(_) => Status::resource_exhausted(err.to_string()),
        other => Status::internal(other.to_string()),
    }
}

#[tonic::async_trait]
impl<R: Repository> ShortenerGrpc for ShortenerGrpcServer<R> {
    async fn shorten(
        &self,
        request: Request<proto::ShortenRequest>,
    ) -> Result<Response<proto::ShortenResponse>, Status> {
        let owner_id = Self::owner_id(&request)?;
        let message = request.into_inner();
        if message.original_url.is_empty() {
            return Err(Status::invalid_argument("original_url is empty"));
        }

        let outcome = self
            .service
            .shorten(&message.original_url, &owner_id)
            .await
            .map_err(status_from)?;
        Ok(Response::new(proto::ShortenResponse {
            already_existed: outcome.already_existed(),
            short_url: outcome.short_url().to_owned(),
        }))
    }

    async fn shorten_batch(
        &self,
        request: Request<proto::ShortenBatchRequest>,
    ) -> Result<Response<proto::ShortenBatchResponse>, Status> {
        let owner_id = Self::owner_id(&request)?;
        let message = request.into_inner();

        let originals: HashMap<String, String> = message
            .entries
            .into_iter()
            .map(|entry| (entry.correlation_id, entry.original_url))
            .collect();
        let short_urls = self
            .service
            .shorten_batch(&originals, &owner_id)
            .await
            .map_err(status_from)?;

        let results = short_urls
            .into_iter()
            .map(|(correlation_id, short_url)| proto::BatchResult {
                correlation_id,
                short_url,
            })
            .collect();
        Ok(Response::new(proto::ShortenBatchResponse { results }))
    }

    async fn resolve(
        &self,
        request: Request<proto::ResolveRequest>,
    ) -> Result<Response<proto::ResolveResponse>, Status> {
        let message = request.into_inner();
        let original_url = self
            .service
            .resolve(&message.short_code)
            .await
            .map_err(status_from)?;
        Ok(Response::new(proto::ResolveResponse { original_url }))
    }

    async fn list_user_urls(
        &self,
        request: Request<proto::ListUserUrlsRequest>,
    ) -> Result<Response<proto::ListUserUrlsResponse>, Status> {
        let owner_id = Self::owner_id(&request)?;
        let owned = self
            .service
            .list_owned(&owner_id)
            .await
            .map_err(status_from)?;

        let urls = owned
            .into_iter()
            .map(|(short_url, original_url)| proto::UserUrl {
                short_url,
                original_url,
            })
            .collect();
        Ok(Response::new(proto::ListUserUrlsResponse { urls }))
    }

    async fn delete_user_urls(
        &self,
        request: Request<proto::DeleteUserUrlsRequest>,
    ) -> Result<Response<proto::DeleteUserUrlsResponse>, Status> {
        let owner_id = Self::owner_id(&request)?;
        let message = request.into_inner();
        self.service
            .request_deletion(&message.short_codes, &owner_id)
            .await;
        Ok(Response::new(proto::DeleteUserUrlsResponse {}))
    }

    async fn get_stats(
        &self,
        request: Request<proto::GetStatsRequest>,
    ) -> Result<Response<proto::GetStatsResponse>, Status> {
        self.check_trusted(&request)?;
        let stats = self.service.stats().await.map_err(status_from)?;
        Ok(Response::new(proto::GetStatsResponse {
            urls: stats.urls as i64,
            users: stats.users as i64,
        }))
    }

    async fn ping(
        &self,
        _request: Request<proto::PingRequest>,
    ) -> Result<Response<proto::PingResponse>, Status> {
        self.service.ping().await.map_err(status_from)?;
        Ok(Response::new(proto::PingResponse {}))
    }
}
