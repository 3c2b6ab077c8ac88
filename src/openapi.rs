use crate::models::{Attachment, Pin, PinList};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::receive_event,
        crate::routes::list_pins,
    ),
    components(schemas(Pin, Attachment, PinList)),
    tags(
        (name = "pins", description = "Slack pin webhook and pin listing"),
    )
)]
pub struct ApiDoc;
