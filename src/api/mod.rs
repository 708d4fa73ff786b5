use rocket::Route;

mod public;
mod tally;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(public::routes());
    routes.extend(tally::routes());
    routes
}
